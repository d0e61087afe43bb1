//! Stateless steering forces.
//!
//! Controllers compose these additively: desired + separation (+ orbit
//! near a combat target), then clamp to the active speed cap.

use crate::components::UnitSnapshot;
use crate::math::{Facing, Vec2, EPSILON};

/// Weight of raw overlap (px) added on top of the nearness factor.
pub const OVERLAP_WEIGHT: f32 = 0.2;

/// A nearby body to steer away from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Neighbor position.
    pub pos: Vec2,
    /// Neighbor collision radius.
    pub radius: f32,
}

impl From<&UnitSnapshot> for Neighbor {
    fn from(snap: &UnitSnapshot) -> Self {
        Self {
            pos: snap.pos,
            radius: snap.radius,
        }
    }
}

/// Velocity of magnitude `speed` pointing from `from` towards `target`.
///
/// Zero when the two points coincide.
#[must_use]
pub fn desired_velocity(from: Vec2, target: Vec2, speed: f32) -> Vec2 {
    (target - from).normalize_or_zero() * speed
}

/// Push away from every neighbor inside its influence distance.
///
/// The influence distance is `max(radii_sum, range)`. Each push has
/// magnitude `strength * (nearness + overlap * OVERLAP_WEIGHT)` where
/// nearness goes from 1 at zero distance to 0 at the influence boundary.
/// Neighbors at (almost) the same coordinates are skipped; that is how the
/// unit's own entry is ignored.
#[must_use]
pub fn separation_velocity<I>(pos: Vec2, radius: f32, neighbors: I, range: f32, strength: f32) -> Vec2
where
    I: IntoIterator<Item = Neighbor>,
{
    let mut acc = Vec2::ZERO;

    for n in neighbors {
        let away = pos - n.pos;
        let dist = away.length();
        if dist < EPSILON {
            continue;
        }

        let min_dist = radius + n.radius;
        let influence = min_dist.max(range);
        if dist >= influence {
            continue;
        }

        let overlap = (min_dist - dist).max(0.0);
        let nearness = 1.0 - dist / influence;
        let k = strength * (nearness + overlap * OVERLAP_WEIGHT);
        acc += away * (k / dist);
    }

    acc
}

/// Force perpendicular to the direction from `pos` to `point`.
///
/// The sign of `bias` picks clockwise vs counter-clockwise, so a unit with
/// a fixed bias always orbits the same way.
#[must_use]
pub fn tangential_around_point(pos: Vec2, point: Vec2, strength: f32, bias: f32) -> Vec2 {
    let n = (point - pos).normalize_or_zero();
    if n == Vec2::ZERO {
        return Vec2::ZERO;
    }

    let sign = if bias >= 0.0 { 1.0 } else { -1.0 };
    Vec2::new(sign * n.y * strength, sign * -n.x * strength)
}

/// Rescale `v` down to `max` if it is longer; otherwise unchanged.
#[must_use]
pub fn clamp_mag(v: Vec2, max: f32) -> Vec2 {
    let m = v.length();
    if m <= max || m < EPSILON {
        return v;
    }
    v * (max / m)
}

/// Facing for a movement delta. See [`Facing::from_delta`].
#[must_use]
pub fn dir_from_delta(dx: f32, dy: f32) -> Facing {
    Facing::from_delta(dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_desired_velocity_has_requested_speed() {
        let v = desired_velocity(Vec2::ZERO, Vec2::new(30.0, 40.0), 100.0);
        assert!(approx(v.x, 60.0));
        assert!(approx(v.y, 80.0));
    }

    #[test]
    fn test_desired_velocity_zero_when_coincident() {
        let p = Vec2::new(5.0, 5.0);
        assert_eq!(desired_velocity(p, p, 100.0), Vec2::ZERO);
    }

    #[test]
    fn test_separation_skips_identical_coordinates() {
        let p = Vec2::new(10.0, 10.0);
        let neighbors = [Neighbor { pos: p, radius: 20.0 }];
        assert_eq!(separation_velocity(p, 20.0, neighbors, 140.0, 260.0), Vec2::ZERO);
    }

    #[test]
    fn test_separation_zero_outside_influence() {
        let neighbors = [Neighbor {
            pos: Vec2::new(200.0, 0.0),
            radius: 10.0,
        }];
        assert_eq!(
            separation_velocity(Vec2::ZERO, 10.0, neighbors, 140.0, 260.0),
            Vec2::ZERO
        );
    }

    #[test]
    fn test_separation_pushes_away_with_overlap_term() {
        // radii sum 40, dist 20: nearness = 1 - 20/140, overlap = 20
        let neighbors = [Neighbor {
            pos: Vec2::new(20.0, 0.0),
            radius: 20.0,
        }];
        let v = separation_velocity(Vec2::ZERO, 20.0, neighbors, 140.0, 100.0);
        let expected = 100.0 * ((1.0 - 20.0 / 140.0) + 20.0 * OVERLAP_WEIGHT);
        assert!(v.x < 0.0);
        assert!(approx(v.x, -expected));
        assert!(approx(v.y, 0.0));
    }

    #[test]
    fn test_separation_uses_radii_sum_when_larger_than_range() {
        // range 10 but radii sum 100: still inside influence at dist 50
        let neighbors = [Neighbor {
            pos: Vec2::new(0.0, 50.0),
            radius: 50.0,
        }];
        let v = separation_velocity(Vec2::ZERO, 50.0, neighbors, 10.0, 1.0);
        assert!(v.y < 0.0);
    }

    #[test]
    fn test_tangential_direction_follows_bias_sign() {
        let cw = tangential_around_point(Vec2::ZERO, Vec2::new(10.0, 0.0), 5.0, 0.3);
        let ccw = tangential_around_point(Vec2::ZERO, Vec2::new(10.0, 0.0), 5.0, -0.3);
        assert!(approx(cw.x, 0.0) && approx(cw.y, -5.0));
        assert!(approx(ccw.x, 0.0) && approx(ccw.y, 5.0));
    }

    #[test]
    fn test_tangential_zero_at_point() {
        let p = Vec2::new(1.0, 1.0);
        assert_eq!(tangential_around_point(p, p, 5.0, 1.0), Vec2::ZERO);
    }

    #[test]
    fn test_clamp_mag() {
        let v = clamp_mag(Vec2::new(30.0, 40.0), 10.0);
        assert!(approx(v.length(), 10.0));
        let short = Vec2::new(1.0, 1.0);
        assert_eq!(clamp_mag(short, 10.0), short);
    }

    proptest! {
        #[test]
        fn prop_clamp_never_exceeds_max(x in -1e4f32..1e4, y in -1e4f32..1e4, max in 0.1f32..1e3) {
            let v = clamp_mag(Vec2::new(x, y), max);
            prop_assert!(v.length() <= max * 1.0001);
        }

        #[test]
        fn prop_steering_outputs_are_finite(
            ax in -1e3f32..1e3, ay in -1e3f32..1e3,
            bx in -1e3f32..1e3, by in -1e3f32..1e3,
        ) {
            let a = Vec2::new(ax, ay);
            let b = Vec2::new(bx, by);
            let d = desired_velocity(a, b, 200.0);
            let s = separation_velocity(a, 20.0, [Neighbor { pos: b, radius: 20.0 }], 140.0, 260.0);
            let t = tangential_around_point(a, b, 220.0, -1.0);
            for v in [d, s, t] {
                prop_assert!(v.x.is_finite() && v.y.is_finite());
            }
        }
    }
}
