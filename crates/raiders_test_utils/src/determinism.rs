//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the unit simulation produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A scene must replay exactly from its seed and its `(now, dt)` sequence.
//! Sources of non-determinism include:
//!
//! - **HashMap iteration order**: the default hasher is randomized. Units
//!   are processed in insertion order and maps that are iterated are
//!   `BTreeMap`s.
//!
//! - **Unseeded randomness**: controller personalities, wander targets and
//!   enemy spawns all draw from an injected, seeded generator.
//!
//! - **Wall-clock time**: nothing reads the clock; every tick is given
//!   `now` and `dt` explicitly.
//!
//! Positions are `f32`, so hashes compare bit patterns: two runs on the
//! same build and target must match exactly.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use raiders_core::math::Millis;
use raiders_core::unit_system::UnitSystem;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance the state by one tick, given the tick index
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use raiders_test_utils::determinism::verify_determinism;
/// use raiders_test_utils::fixtures::skirmish;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     300, // 300 ticks each
///     || skirmish(7, 3, 5),
///     |system, tick| { system.update(tick as f64 * 16.0, 16.0); },
///     |system| system.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for tick in 1..=ticks {
            step(&mut state, tick);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Tick a [`UnitSystem`] with a fixed timestep, starting at `now = dt`.
pub fn run_system(system: &mut UnitSystem, ticks: u64, dt: Millis) {
    for tick in 1..=ticks {
        system.update(tick as Millis * dt, dt);
    }
}

/// Run two identically built unit systems and compare final hashes.
///
/// # Example
///
/// ```ignore
/// use raiders_test_utils::determinism::verify_system_determinism;
/// use raiders_test_utils::fixtures::skirmish;
///
/// assert!(verify_system_determinism(|| skirmish(1, 2, 2), 500, 16.0));
/// ```
pub fn verify_system_determinism<F>(setup_fn: F, num_ticks: u64, dt: Millis) -> bool
where
    F: Fn() -> UnitSystem,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |system, tick| {
            system.update(tick as Millis * dt, dt);
        },
        UnitSystem::state_hash,
    )
    .is_deterministic
}

/// Find the first tick at which two identically built systems diverge.
///
/// Returns `Some(0)` if they already differ before the first tick and
/// `None` if they stay identical for `num_ticks`.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, dt: Millis) -> Option<u64>
where
    F: Fn() -> UnitSystem,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        let now = tick as Millis * dt;
        a.update(now, dt);
        b.update(now, dt);
        if a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Build and run `num_sims` systems on separate threads and collect their
/// final hashes.
pub fn run_parallel_systems<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
    dt: Millis,
) -> DeterminismResult
where
    F: Fn() -> UnitSystem + Sync,
{
    let setup = &setup_fn;
    let hashes: Vec<u64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                scope.spawn(move || {
                    let mut system = setup();
                    run_system(&mut system, num_ticks, dt);
                    system.state_hash()
                })
            })
            .collect();

        // panicked runs report u64::MAX
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(u64::MAX))
            .collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks: num_ticks,
    }
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use proptest::prelude::*;
    use raiders_core::components::BaseStats;
    use raiders_core::math::Vec2;

    /// Position inside a 4000 x 4000 world.
    pub fn arb_position() -> impl Strategy<Value = Vec2> {
        (0.0f32..4000.0, 0.0f32..4000.0).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// Offset of up to 500 px per axis.
    pub fn arb_offset() -> impl Strategy<Value = Vec2> {
        (-500.0f32..500.0, -500.0f32..500.0).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// Damage amounts, including negative and zero ones.
    pub fn arb_damage() -> impl Strategy<Value = f32> {
        -50.0f32..500.0
    }

    /// Stat blocks that pass catalog validation (cooldown >= windup).
    pub fn arb_stats() -> impl Strategy<Value = BaseStats> {
        (
            1.0f32..1000.0,
            10.0f32..300.0,
            10.0f32..400.0,
            0.0f32..3000.0,
            0.0f32..300.0,
            0.0f64..800.0,
            0.0f64..2000.0,
            0.0f32..100.0,
        )
            .prop_map(
                |(max_hp, walk, run, aggro, range, windup, extra_cd, damage)| BaseStats {
                    max_hp,
                    walk_speed: walk,
                    run_speed: run,
                    aggro_range: aggro,
                    attack_range: range,
                    attack_windup_ms: windup,
                    attack_cooldown_ms: windup + extra_cd,
                    damage,
                },
            )
    }

    /// Spawn layout: positions of allies and enemies.
    pub fn arb_layout(max_per_team: usize) -> impl Strategy<Value = (Vec<Vec2>, Vec<Vec2>)> {
        (
            proptest::collection::vec(arb_position(), 1..max_per_team),
            proptest::collection::vec(arb_position(), 1..max_per_team),
        )
    }
}
