//! The simulator adapter contract.
//!
//! The engine drives any game that can step deterministically, snapshot
//! itself and restore a snapshot. It holds exactly one simulator by
//! exclusive ownership for the duration of a match and never inspects the
//! contents of inputs or snapshots.

use crate::{Config, InputStatus};

/// A deterministic, rewindable game simulation.
///
/// # Determinism
///
/// `step` MUST be deterministic: the same prior state and the same input
/// map must produce the same resulting state, bit-identical across all
/// participants and platforms. Concretely, a conforming simulator
///
/// - seeds all randomness from the shared match seed and advances it only
///   through state captured by `save_state` (see [`Pcg32`]);
/// - performs no floating-point operations whose results depend on platform
///   rounding mode, denormal handling or FMA contraction (stick to the
///   deterministic IEEE-754 subset, or use fixed-point);
/// - never reads the time of day, a monotonic clock, uninitialized memory
///   or randomized hashes;
/// - never iterates unordered containers (sort by key, or don't iterate).
///
/// Non-determinism cannot be recovered from — it desyncs the match — and is
/// only detectable by comparing snapshot checksums (see
/// [`SyncCheckSession`]).
///
/// [`Pcg32`]: crate::rng::Pcg32
/// [`SyncCheckSession`]: crate::SyncCheckSession
pub trait Simulator<T>
where
    T: Config,
{
    /// Advances the simulation by exactly one logical frame.
    ///
    /// `inputs` contains one entry per controller slot, in roster order,
    /// each tagged with whether it is confirmed or predicted. The simulator
    /// may emit audio here; see [`set_audio_muted`](Self::set_audio_muted).
    fn step(&mut self, inputs: &[(T::Input, InputStatus)]);

    /// Captures all mutable state needed to restore an equivalent simulator
    /// via [`load_state`](Self::load_state).
    ///
    /// Two snapshots taken from bit-identical simulator states must be
    /// equal. Immutable data (ROM images, read-only tables) should be
    /// excluded.
    fn save_state(&mut self) -> T::State;

    /// Restores the simulator so that subsequent `step` calls behave
    /// identically to the original from that point. `load_state` composed
    /// with `save_state` is the identity on simulator behavior.
    ///
    /// The snapshot is borrowed from the engine's history store; copy
    /// internally if it must be retained.
    fn load_state(&mut self, state: &T::State);

    /// Presents the current frame.
    ///
    /// Must be a pure read of state — never mutate here — and may be
    /// skipped entirely without affecting determinism.
    fn render(&mut self);

    /// Toggles audio muting.
    ///
    /// The engine mutes during rollback re-simulation and unmutes for the
    /// authoritative live frame, so rolled-back frames never reach the
    /// output device. Muted steps must remain byte-deterministic. The
    /// default is a no-op for silent simulators.
    fn set_audio_muted(&mut self, muted: bool) {
        let _ = muted;
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
mod simulator_tests {
    use super::*;
    use crate::Config;

    struct TestConfig;

    impl Config for TestConfig {
        type Input = u8;
        type State = i64;
    }

    #[derive(Default)]
    struct Adder {
        total: i64,
    }

    impl Simulator<TestConfig> for Adder {
        fn step(&mut self, inputs: &[(u8, InputStatus)]) {
            for (bits, _) in inputs {
                self.total += i64::from(*bits);
            }
        }

        fn save_state(&mut self) -> i64 {
            self.total
        }

        fn load_state(&mut self, state: &i64) {
            self.total = *state;
        }

        fn render(&mut self) {}
    }

    #[test]
    fn save_load_round_trip_is_identity() {
        let mut sim = Adder::default();
        sim.step(&[(3, InputStatus::Confirmed)]);
        let snapshot = sim.save_state();
        sim.step(&[(5, InputStatus::Confirmed)]);
        sim.load_state(&snapshot);
        sim.step(&[(5, InputStatus::Confirmed)]);
        assert_eq!(sim.save_state(), 8);
    }

    #[test]
    fn default_mute_is_noop() {
        let mut sim = Adder::default();
        sim.set_audio_muted(true);
        sim.set_audio_muted(false);
        assert_eq!(sim.save_state(), 0);
    }
}
