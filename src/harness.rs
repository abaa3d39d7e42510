//! Determinism checking for simulator adapters.
//!
//! Non-determinism is the one failure the engine cannot recover from, and
//! it is invisible until peers desync. [`SyncCheckSession`] makes it
//! visible during development: it drives a single local simulator, and
//! after every stepped frame it rolls back `check_distance` frames and
//! re-simulates them, comparing snapshot checksums against the original
//! pass. Any divergence means `step` consulted something outside the saved
//! state — a wall clock, an unseeded RNG, unordered iteration — and the
//! adapter is not fit for a networked match.

use std::collections::BTreeMap;
use std::hash::Hash;

use crate::checksum::hash_of;
use crate::history::FrameHistory;
use crate::simulator::Simulator;
use crate::{Config, Frame, InputStatus, InputVec, RewindError, RewindResult};

/// Replays recent frames after every step and compares checksums.
pub struct SyncCheckSession<T, S>
where
    T: Config,
    S: Simulator<T>,
{
    num_slots: usize,
    check_distance: usize,
    simulator: S,
    history: FrameHistory<T>,
    checksums: BTreeMap<Frame, u64>,
    current_frame: Frame,
}

impl<T, S> SyncCheckSession<T, S>
where
    T: Config,
    T::State: Hash,
    S: Simulator<T>,
{
    /// Creates a check session resimulating the last `check_distance`
    /// frames after every step.
    ///
    /// # Errors
    /// Returns [`RewindError::InvalidRequest`] if `check_distance` is zero
    /// or `num_slots` is zero.
    pub fn new(num_slots: usize, check_distance: usize, simulator: S) -> RewindResult<Self> {
        if num_slots == 0 {
            return Err(RewindError::InvalidRequest {
                info: "a check session needs at least one player slot",
            });
        }
        if check_distance == 0 {
            return Err(RewindError::InvalidRequest {
                info: "check_distance must be at least 1",
            });
        }
        Ok(Self {
            num_slots,
            check_distance,
            history: FrameHistory::new(num_slots, check_distance, 0),
            simulator,
            checksums: BTreeMap::new(),
            current_frame: Frame::new(0),
        })
    }

    /// The frame the session will step next.
    #[must_use]
    pub fn current_frame(&self) -> Frame {
        self.current_frame
    }

    /// Read access to the owned simulator.
    #[must_use]
    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    /// Steps one frame with the given per-slot inputs, then replays the
    /// last `check_distance` frames and verifies their checksums.
    ///
    /// # Errors
    /// Returns [`RewindError::InvalidRequest`] if `inputs` does not contain
    /// exactly one input per slot, and [`RewindError::MismatchedChecksum`]
    /// if re-simulation diverged — the simulator is non-deterministic,
    /// which is fatal for a match.
    pub fn advance_frame(&mut self, inputs: &[T::Input]) -> RewindResult<()> {
        if inputs.len() != self.num_slots {
            return Err(RewindError::InvalidRequest {
                info: "advance_frame needs exactly one input per slot",
            });
        }

        let frame = self.current_frame;
        let mut gathered: InputVec<T::Input> = InputVec::new();
        for (slot, input) in inputs.iter().enumerate() {
            self.history.insert_confirmed(frame, slot, *input);
            gathered.push((*input, InputStatus::Confirmed));
        }

        let snapshot = self.simulator.save_state();
        self.checksums.insert(frame, hash_of(&snapshot));
        self.history.insert_snapshot(frame, snapshot);
        self.history.insert_used(frame, gathered.clone());
        self.simulator.step(&gathered);
        self.current_frame = frame.saturating_next();

        self.verify_recent()?;
        self.prune();
        Ok(())
    }

    /// Rolls back `check_distance` frames and re-simulates, comparing each
    /// pre-step checksum with the recorded one.
    fn verify_recent(&mut self) -> RewindResult<()> {
        let start = self.current_frame - self.check_distance as i32;
        if !start.is_valid() || !self.history.has_snapshot(start) {
            return Ok(());
        }

        if let Some(state) = self.history.snapshot(start) {
            self.simulator.load_state(state);
        }
        let mut mismatched = Vec::new();
        let mut frame = start;
        while frame < self.current_frame {
            let resaved = self.simulator.save_state();
            if self.checksums.get(&frame) != Some(&hash_of(&resaved)) {
                mismatched.push(frame);
            }
            if let Some(used) = self.history.used_inputs(frame) {
                self.simulator.step(used);
            }
            frame = frame.saturating_next();
        }

        if mismatched.is_empty() {
            Ok(())
        } else {
            Err(RewindError::MismatchedChecksum {
                current_frame: self.current_frame,
                mismatched_frames: mismatched,
            })
        }
    }

    fn prune(&mut self) {
        let floor = Frame::new(
            (self.current_frame.as_i32() - self.check_distance as i32 - 1).max(0),
        );
        self.history.prune_below(floor);
        self.checksums.retain(|frame, _| *frame >= floor);
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
mod harness_tests {
    use super::*;
    use crate::rng::Pcg32;

    struct TestConfig;

    impl Config for TestConfig {
        type Input = u8;
        type State = (u64, Pcg32);
    }

    /// Deterministic: all entropy lives in the saved state.
    struct SeededSim {
        acc: u64,
        rng: Pcg32,
    }

    impl SeededSim {
        fn new(seed: u32) -> Self {
            Self {
                acc: 0,
                rng: Pcg32::from_match_seed(seed),
            }
        }
    }

    impl Simulator<TestConfig> for SeededSim {
        fn step(&mut self, inputs: &[(u8, InputStatus)]) {
            for (bits, _) in inputs {
                self.acc = self
                    .acc
                    .wrapping_mul(31)
                    .wrapping_add(u64::from(*bits))
                    .wrapping_add(u64::from(self.rng.next_u32()));
            }
        }

        fn save_state(&mut self) -> (u64, Pcg32) {
            (self.acc, self.rng)
        }

        fn load_state(&mut self, state: &(u64, Pcg32)) {
            self.acc = state.0;
            self.rng = state.1;
        }

        fn render(&mut self) {}
    }

    /// Broken: entropy outside the saved state survives rollback.
    struct LeakySim {
        acc: u64,
        hidden: u64,
    }

    impl Simulator<TestConfig> for LeakySim {
        fn step(&mut self, inputs: &[(u8, InputStatus)]) {
            self.hidden = self.hidden.wrapping_add(1);
            for (bits, _) in inputs {
                self.acc = self
                    .acc
                    .wrapping_mul(31)
                    .wrapping_add(u64::from(*bits))
                    .wrapping_add(self.hidden);
            }
        }

        fn save_state(&mut self) -> (u64, Pcg32) {
            // hidden is deliberately not captured
            (self.acc, Pcg32::from_match_seed(0))
        }

        fn load_state(&mut self, state: &(u64, Pcg32)) {
            self.acc = state.0;
        }

        fn render(&mut self) {}
    }

    #[test]
    fn deterministic_simulator_passes() {
        let mut session = SyncCheckSession::new(2, 3, SeededSim::new(0x5EED)).unwrap();
        for frame in 0..120u8 {
            session.advance_frame(&[frame, frame.wrapping_mul(3)]).unwrap();
        }
        assert_eq!(session.current_frame(), Frame::new(120));
    }

    #[test]
    fn leaky_simulator_is_caught() {
        let mut session = SyncCheckSession::new(
            1,
            2,
            LeakySim {
                acc: 0,
                hidden: 0,
            },
        )
        .unwrap();
        let mut failed = false;
        for frame in 0..10u8 {
            if let Err(RewindError::MismatchedChecksum { .. }) = session.advance_frame(&[frame]) {
                failed = true;
                break;
            }
        }
        assert!(failed, "hidden state should produce a checksum mismatch");
    }

    #[test]
    fn rejects_wrong_input_count() {
        let mut session = SyncCheckSession::new(2, 2, SeededSim::new(1)).unwrap();
        assert!(session.advance_frame(&[1]).is_err());
    }

    #[test]
    fn rejects_zero_check_distance() {
        assert!(SyncCheckSession::new(1, 0, SeededSim::new(1)).is_err());
    }
}
