//! 2D vector math for the unit simulation.
//!
//! Positions and velocities are in world pixels (velocities in px/s).
//! The simulation is single-threaded and fed explicit tick times, so
//! plain `f32` arithmetic is reproducible run to run.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Distances below this are treated as zero to avoid dividing by ~0.
pub const EPSILON: f32 = 1e-4;

/// Simulation time in milliseconds.
pub type Millis = f64;

/// 2D vector in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate (grows downwards, screen convention).
    pub y: f32,
}

impl Vec2 {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Sum of absolute components (cheap "is it moving" check).
    #[must_use]
    pub fn manhattan_length(self) -> f32 {
        self.x.abs() + self.y.abs()
    }

    /// Unit vector in the same direction, or zero when the length is below [`EPSILON`].
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > EPSILON {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// Scale by a scalar.
    #[must_use]
    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k)
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        self.scale(rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

/// One of the four cardinal directions a unit can face.
///
/// Sprite sheets store one row per facing, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Towards +y (screen down).
    #[default]
    Down,
    /// Towards -y.
    Up,
    /// Towards -x.
    Left,
    /// Towards +x.
    Right,
}

impl Facing {
    /// All facings in sprite-sheet row order.
    pub const ALL: [Self; 4] = [Self::Down, Self::Up, Self::Left, Self::Right];

    /// Map a movement delta to a facing.
    ///
    /// Horizontal wins only when `|dx| > |dy|`; ties go vertical.
    #[must_use]
    pub fn from_delta(dx: f32, dy: f32) -> Self {
        if dx.abs() > dy.abs() {
            if dx < 0.0 {
                Self::Left
            } else {
                Self::Right
            }
        } else if dy < 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }

    /// Sprite-sheet row holding this facing.
    #[must_use]
    pub const fn row(self) -> u32 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    /// Lowercase name, as used in animation keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}
