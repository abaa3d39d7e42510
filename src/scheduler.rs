//! The rollback scheduler: the outer loop of the engine.
//!
//! A tick advances the simulation by exactly one frame: read local input,
//! queue it with input-delay and broadcast it, consume any pending rollback,
//! snapshot, gather inputs (confirmed or predicted), step, update the
//! confirmed watermark, prune history. Remote input ingest happens strictly
//! between ticks — `&mut self` receivers make the single-threaded contract
//! a compile-time fact — and mispredicted frames are repaired by rewinding
//! to the earliest contradicted frame and re-simulating forward.

use std::time::Duration;

use smallvec::SmallVec;

use crate::error::ConfigErrorKind;
use crate::history::FrameHistory;
use crate::predictor::{HoldLast, PredictionStrategy};
use crate::simulator::Simulator;
use crate::stats::RollbackStats;
use crate::telemetry::{ObserverHandle, ViolationKind, ViolationSeverity};
use crate::{
    report_violation, Config, Frame, InputStatus, InputVec, PlayerSlot, RewindError, RewindResult,
};

/// The highest supported input delay, in frames.
///
/// Half a second at 60 fps; beyond this the game is unplayable anyway and
/// the history ring would be dominated by queued local inputs.
pub const MAX_INPUT_DELAY: usize = 30;

/// Tuning parameters for a [`RollbackScheduler`], fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    input_delay: usize,
    max_rollback: usize,
    target_fps: u32,
    strict_inputs: bool,
}

impl Default for EngineConfig {
    /// 2 frames of input delay (~33 ms at 60 Hz), up to 8 frames of
    /// rollback, 60 fps, strict input protocol checking.
    fn default() -> Self {
        Self {
            input_delay: 2,
            max_rollback: 8,
            target_fps: 60,
            strict_inputs: true,
        }
    }
}

impl EngineConfig {
    /// Sets the artificial delay between a local input being read and the
    /// frame it takes effect on.
    ///
    /// All participants apply the same delay, which gives an input
    /// `input_delay` frames of headroom to cross the wire before the
    /// receiver steps past it. Larger values reduce rollback frequency at
    /// the cost of felt input lag.
    ///
    /// # Errors
    /// Returns [`RewindError::InvalidConfig`] if `delay` exceeds
    /// [`MAX_INPUT_DELAY`].
    pub fn with_input_delay(mut self, delay: usize) -> RewindResult<Self> {
        if delay > MAX_INPUT_DELAY {
            return Err(ConfigErrorKind::ExcessiveInputDelay {
                delay,
                max: MAX_INPUT_DELAY,
            }
            .into());
        }
        self.input_delay = delay;
        Ok(self)
    }

    /// Sets the maximum number of frames the engine will rewind.
    ///
    /// The engine also refuses to run more than this many frames ahead of
    /// its slowest peer, so a deeper rollback is never required.
    ///
    /// # Errors
    /// Returns [`RewindError::InvalidConfig`] if `frames` is zero.
    pub fn with_max_rollback(mut self, frames: usize) -> RewindResult<Self> {
        if frames == 0 {
            return Err(ConfigErrorKind::ZeroMaxRollback.into());
        }
        self.max_rollback = frames;
        Ok(self)
    }

    /// Sets the nominal simulation rate.
    ///
    /// # Errors
    /// Returns [`RewindError::InvalidConfig`] if `fps` is zero.
    pub fn with_target_fps(mut self, fps: u32) -> RewindResult<Self> {
        if fps == 0 {
            return Err(ConfigErrorKind::ZeroFps.into());
        }
        self.target_fps = fps;
        Ok(self)
    }

    /// Chooses between strict and lenient handling of a peer redelivering a
    /// confirmed input with a different value.
    ///
    /// Strict (the default) surfaces [`RewindError::ConflictingInput`] —
    /// the deterministic contract is broken and continuing silently would
    /// desync. Lenient logs the violation and discards the redelivery.
    #[must_use]
    pub fn with_strict_inputs(mut self, strict: bool) -> Self {
        self.strict_inputs = strict;
        self
    }

    /// Frames of artificial local input delay.
    #[must_use]
    pub fn input_delay(&self) -> usize {
        self.input_delay
    }

    /// Maximum frames of rewind.
    #[must_use]
    pub fn max_rollback(&self) -> usize {
        self.max_rollback
    }

    /// Nominal simulation rate in frames per second.
    #[must_use]
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Whether conflicting input redelivery is a hard error.
    #[must_use]
    pub fn strict_inputs(&self) -> bool {
        self.strict_inputs
    }

    /// The duration of one simulation frame.
    #[must_use]
    pub fn frame_period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.target_fps))
    }

    /// How far back the predictor searches for a held input.
    #[must_use]
    pub fn prediction_window(&self) -> usize {
        2 * self.max_rollback
    }
}

/// The environment contract of the scheduler.
///
/// The engine owns no transport and no input device; both are reached
/// through a `Host` borrowed for the duration of each tick.
pub trait Host<T>
where
    T: Config,
{
    /// Returns the live local controller state, called exactly once per
    /// tick. The engine applies input delay itself; return the *current*
    /// state, not a delayed one.
    fn read_local_input(&mut self) -> T::Input;

    /// Called exactly once per tick with the delayed frame number the local
    /// input was queued for. The environment transmits it to all peers.
    fn send_local_input(&mut self, frame: Frame, input: T::Input);

    /// Diagnostic callback, invoked once per tick. The default ignores it.
    fn on_stats(&mut self, stats: &RollbackStats) {
        let _ = stats;
    }
}

/// What a call to [`RollbackScheduler::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    /// The simulation advanced by one frame.
    Stepped,
    /// The engine is `max_rollback` frames ahead of its slowest peer and
    /// refused to speculate further; no frame was stepped. Keep ticking —
    /// the engine catches up once peer inputs arrive.
    Stalled,
    /// The scheduler is stopped; no frame was stepped.
    Stopped,
}

/// The rollback scheduler.
///
/// Owns the simulator, the frame history and all match bookkeeping.
/// Everything runs on one logical thread: `tick` and
/// [`receive_remote_input`](Self::receive_remote_input) both take
/// `&mut self`, so a tick is an atomic unit and the set of confirmed inputs
/// is frozen while it runs. Multi-threaded runtimes must serialize network
/// callbacks onto the thread driving the scheduler (e.g. via a
/// single-consumer channel drained between ticks).
pub struct RollbackScheduler<T, S>
where
    T: Config,
    S: Simulator<T>,
{
    config: EngineConfig,
    local_slot: PlayerSlot,
    num_slots: usize,
    simulator: S,
    history: FrameHistory<T>,
    prediction: Box<dyn PredictionStrategy<T::Input>>,
    current_frame: Frame,
    confirmed_frame: Frame,
    /// Highest frame received per slot; the local slot's entry is unused.
    recv_watermark: SmallVec<[Frame; 4]>,
    pending_rollback: Option<Frame>,
    running: bool,
    stats: RollbackStats,
    observer: ObserverHandle,
}

impl<T, S> RollbackScheduler<T, S>
where
    T: Config,
    S: Simulator<T>,
{
    /// Creates a scheduler for a match with `num_slots` controller slots,
    /// of which `local_slot` is this participant's.
    ///
    /// # Errors
    /// Returns [`RewindError::InvalidRequest`] for an empty slot set and
    /// [`RewindError::InvalidSlot`] if `local_slot` is out of range.
    pub fn new(
        config: EngineConfig,
        local_slot: PlayerSlot,
        num_slots: usize,
        simulator: S,
    ) -> RewindResult<Self> {
        if num_slots == 0 {
            return Err(RewindError::InvalidRequest {
                info: "a match needs at least one player slot",
            });
        }
        if !local_slot.is_valid_for(num_slots) {
            return Err(RewindError::InvalidSlot {
                slot: local_slot,
                num_slots,
            });
        }
        let mut recv_watermark = SmallVec::with_capacity(num_slots);
        recv_watermark.resize(num_slots, Frame::NULL);
        Ok(Self {
            history: FrameHistory::new(num_slots, config.max_rollback(), config.input_delay()),
            config,
            local_slot,
            num_slots,
            simulator,
            prediction: Box::new(HoldLast),
            current_frame: Frame::new(0),
            confirmed_frame: Frame::NULL,
            recv_watermark,
            pending_rollback: None,
            running: false,
            stats: RollbackStats::default(),
            observer: crate::telemetry::default_observer(),
        })
    }

    /// Replaces the default [`HoldLast`] prediction strategy.
    ///
    /// The strategy must be identical on every participant, or rollback
    /// re-simulation diverges.
    #[must_use]
    pub fn with_prediction_strategy(
        mut self,
        strategy: Box<dyn PredictionStrategy<T::Input>>,
    ) -> Self {
        self.prediction = strategy;
        self
    }

    /// Replaces the default tracing-backed violation observer.
    #[must_use]
    pub fn with_observer(mut self, observer: ObserverHandle) -> Self {
        self.observer = observer;
        self
    }

    /// Begins driving the simulation. Idempotent; restarting after
    /// [`stop`](Self::stop) resumes from the retained frame counter.
    pub fn start(&mut self) {
        if !self.running {
            tracing::info!(frame = %self.current_frame, "scheduler started");
            self.running = true;
        }
    }

    /// Ceases driving the simulation at the next tick boundary. The
    /// simulator is not torn down; it is merely no longer stepped.
    pub fn stop(&mut self) {
        if self.running {
            tracing::info!(frame = %self.current_frame, "scheduler stopped");
            self.running = false;
        }
    }

    /// Returns `true` while the scheduler is started.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The frame the scheduler will step next.
    #[must_use]
    pub fn current_frame(&self) -> Frame {
        self.current_frame
    }

    /// The confirmed-frame watermark: at or below it, every player's input
    /// was known at step time and no further misprediction is possible.
    #[must_use]
    pub fn confirmed_frame(&self) -> Frame {
        self.confirmed_frame
    }

    /// The tuning parameters this scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Diagnostic counters for the match so far.
    #[must_use]
    pub fn stats(&self) -> &RollbackStats {
        &self.stats
    }

    /// Read access to the history stores, for diagnostics and tests.
    #[must_use]
    pub fn history(&self) -> &FrameHistory<T> {
        &self.history
    }

    /// Read access to the owned simulator.
    #[must_use]
    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    /// Presents the current frame. Call once per outer loop iteration,
    /// regardless of how many ticks executed, to avoid flicker.
    pub fn render(&mut self) {
        self.simulator.render();
    }

    /// Advances the simulation by exactly one frame.
    ///
    /// Runs the full tick sequence atomically: local input capture +
    /// broadcast, pending rollback, snapshot, gather, step, watermark +
    /// prune + stats, advance. Returns [`TickOutcome::Stalled`] without
    /// stepping when the engine would run more than `max_rollback` frames
    /// ahead of its slowest peer.
    ///
    /// # Errors
    /// Currently infallible at runtime; the `Result` reserves room for
    /// strict-mode failures surfaced from future tick-time validation.
    pub fn tick<H>(&mut self, host: &mut H) -> RewindResult<TickOutcome>
    where
        H: Host<T>,
    {
        if !self.running {
            return Ok(TickOutcome::Stopped);
        }
        if self.is_stalled() {
            self.stats.stall_count += 1;
            tracing::debug!(
                frame = %self.current_frame,
                "tick stalled waiting for peer input"
            );
            return Ok(TickOutcome::Stalled);
        }

        // 1. Capture local input, queue it with input delay, broadcast it.
        let local_input = host.read_local_input();
        let queue_frame = self.current_frame.saturating_add(self.config.input_delay() as i32);
        self.history
            .insert_confirmed(queue_frame, self.local_slot.as_usize(), local_input);
        host.send_local_input(queue_frame, local_input);

        // 2. Execute a pending rollback, if one is feasible.
        if let Some(target) = self.pending_rollback.take() {
            self.try_rollback(target);
        }

        // 3. Snapshot the state we are about to step from.
        let snapshot = self.simulator.save_state();
        self.history.insert_snapshot(self.current_frame, snapshot);

        // 4. Gather inputs for this frame, confirmed or predicted.
        let inputs = self.gather_inputs(self.current_frame);
        self.history.insert_used(self.current_frame, inputs.clone());

        // 5. Step.
        self.simulator.step(&inputs);

        // 6. Watermark, prune, stats.
        self.raise_confirmed_watermark();
        self.prune_history();
        self.stats.current_frame = self.current_frame;
        self.stats.confirmed_frame = self.confirmed_frame;
        host.on_stats(&self.stats);

        // 7. Advance.
        self.current_frame = self.current_frame.saturating_next();
        Ok(TickOutcome::Stepped)
    }

    /// Ingests a confirmed input received from a remote peer.
    ///
    /// Tolerates out-of-order arrival; only the earliest contradicted frame
    /// still inside the rollback horizon matters, and later mispredictions
    /// are subsumed by re-simulating forward through them. Garbage is
    /// discarded defensively: local-slot echoes, unknown slots, negative or
    /// far-future frames and stale frames below the prune floor are all
    /// logged and dropped without failing the match.
    ///
    /// # Errors
    /// In strict mode, returns [`RewindError::ConflictingInput`] when a
    /// peer redelivers a confirmed input with a different value.
    pub fn receive_remote_input(
        &mut self,
        frame: Frame,
        slot: PlayerSlot,
        input: T::Input,
    ) -> RewindResult<()> {
        if slot == self.local_slot {
            tracing::debug!(%frame, %slot, "ignoring remote echo of local input");
            return Ok(());
        }
        let s = slot.as_usize();
        if s >= self.num_slots {
            tracing::debug!(%frame, %slot, "ignoring input for unknown slot (roster skew?)");
            return Ok(());
        }
        if !frame.is_valid() {
            report_violation!(
                self.observer,
                ViolationSeverity::Error,
                ViolationKind::Relay,
                "discarding input with invalid frame {} from {}",
                frame,
                slot
            );
            return Ok(());
        }

        // A redelivery is never a misprediction; resolve duplicates against
        // the confirmed store before anything else.
        if let Some(previous) = self.history.confirmed_input(frame, s) {
            if previous == input {
                tracing::debug!(%frame, %slot, "discarding duplicate confirmed input");
                self.raise_recv_watermark(s, frame);
                return Ok(());
            }
            if self.config.strict_inputs() {
                return Err(RewindError::ConflictingInput { frame, slot });
            }
            report_violation!(
                self.observer,
                ViolationSeverity::Error,
                ViolationKind::InputProtocol,
                "conflicting confirmed input redelivered for frame {} {}; discarding",
                frame,
                slot
            );
            return Ok(());
        }

        // Misprediction detection: the frame was already stepped with a
        // value that the authoritative input now contradicts.
        if frame < self.current_frame {
            if let Some(used) = self.history.used_input(frame, s) {
                if used != input {
                    if frame > self.confirmed_frame {
                        tracing::debug!(
                            %frame, %slot,
                            used = ?used, actual = ?input,
                            "misprediction detected, scheduling rollback"
                        );
                        self.pending_rollback = Some(match self.pending_rollback {
                            Some(pending) => pending.min(frame),
                            None => frame,
                        });
                    } else {
                        // Should not occur: at or below the watermark every
                        // input was known at step time. Accept divergence
                        // rather than rewinding past the horizon.
                        report_violation!(
                            self.observer,
                            ViolationSeverity::Warning,
                            ViolationKind::FrameSync,
                            "out-of-horizon misprediction at frame {} (watermark {}); dropped",
                            frame,
                            self.confirmed_frame
                        );
                        return Ok(());
                    }
                }
            }
        }

        let floor = self.prune_floor();
        if frame < floor {
            report_violation!(
                self.observer,
                ViolationSeverity::Warning,
                ViolationKind::InputProtocol,
                "stale input for pruned frame {} from {} (floor {}); dropped",
                frame,
                slot,
                floor
            );
            self.raise_recv_watermark(s, frame);
            return Ok(());
        }
        let horizon = self
            .current_frame
            .saturating_add((self.config.input_delay() + self.config.max_rollback()) as i32);
        if frame > horizon {
            report_violation!(
                self.observer,
                ViolationSeverity::Warning,
                ViolationKind::InputProtocol,
                "input for frame {} from {} is beyond the speculation horizon {}; dropped",
                frame,
                slot,
                horizon
            );
            return Ok(());
        }

        self.history.insert_confirmed(frame, s, input);
        self.raise_recv_watermark(s, frame);
        self.raise_confirmed_watermark();
        Ok(())
    }

    // --- internals ---

    fn is_stalled(&self) -> bool {
        match self.min_peer_watermark() {
            // Degenerate single-participant match never stalls.
            None => false,
            Some(peer_min) => {
                self.current_frame - peer_min >= self.config.max_rollback() as i32
            },
        }
    }

    fn min_peer_watermark(&self) -> Option<Frame> {
        self.recv_watermark
            .iter()
            .enumerate()
            .filter(|(s, _)| *s != self.local_slot.as_usize())
            .map(|(_, frame)| *frame)
            .min()
    }

    fn raise_recv_watermark(&mut self, slot: usize, frame: Frame) {
        if frame > self.recv_watermark[slot] {
            self.recv_watermark[slot] = frame;
        }
    }

    /// Recomputes the confirmed-frame watermark. Monotonic: the candidate
    /// is `min(current + input_delay, min over peers of recv watermark)` —
    /// held below a pending rollback target until the rollback executes —
    /// and the watermark only moves up.
    fn raise_confirmed_watermark(&mut self) {
        let mut candidate = self
            .current_frame
            .saturating_add(self.config.input_delay() as i32);
        if let Some(peer_min) = self.min_peer_watermark() {
            candidate = candidate.min(peer_min);
        }
        if let Some(target) = self.pending_rollback {
            candidate = candidate.min(target - 1);
        }
        if candidate > self.confirmed_frame {
            self.confirmed_frame = candidate;
        }
    }

    fn prune_floor(&self) -> Frame {
        Frame::new(self.confirmed_frame.as_i32().saturating_sub(1).max(0))
    }

    /// Drops history below the prune floor. One frame below the watermark
    /// is retained to keep boundary lookups exact.
    fn prune_history(&mut self) {
        self.history.prune_below(self.prune_floor());
    }

    fn gather_inputs(&self, frame: Frame) -> InputVec<T::Input> {
        let mut inputs = if self.num_slots <= 4 {
            InputVec::new()
        } else {
            InputVec::with_capacity(self.num_slots)
        };
        for s in 0..self.num_slots {
            match self.history.confirmed_input(frame, s) {
                Some(input) => inputs.push((input, InputStatus::Confirmed)),
                None => {
                    let last = self.history.last_confirmed_before(
                        frame,
                        s,
                        self.config.prediction_window(),
                    );
                    inputs.push((
                        self.prediction.predict(frame, last, s),
                        InputStatus::Predicted,
                    ));
                },
            }
        }
        inputs
    }

    /// Validates and executes a rollback to `target`. Infeasible targets
    /// are anomalous (out-of-horizon late arrival or an engine bug) and are
    /// logged and dropped rather than crashing the match.
    fn try_rollback(&mut self, target: Frame) {
        if target <= self.confirmed_frame || target >= self.current_frame {
            report_violation!(
                self.observer,
                ViolationSeverity::Warning,
                ViolationKind::FrameSync,
                "rollback target {} outside window (watermark {}, current {}); dropped",
                target,
                self.confirmed_frame,
                self.current_frame
            );
            return;
        }
        let depth = self.current_frame - target;
        if depth > self.config.max_rollback() as i32 {
            report_violation!(
                self.observer,
                ViolationSeverity::Warning,
                ViolationKind::FrameSync,
                "rollback to {} would rewind {} frames (max {}); accepting divergence",
                target,
                depth,
                self.config.max_rollback()
            );
            return;
        }
        if !self.history.has_snapshot(target) {
            report_violation!(
                self.observer,
                ViolationSeverity::Critical,
                ViolationKind::Internal,
                "no snapshot retained for rollback target {}",
                target
            );
            return;
        }
        self.execute_rollback(target);
    }

    /// Rewinds to `target` and re-simulates up to (but excluding) the
    /// current frame with the freshest confirmed inputs.
    fn execute_rollback(&mut self, target: Frame) {
        tracing::debug!(
            %target,
            current = %self.current_frame,
            "rolling back"
        );
        self.simulator.set_audio_muted(true);
        if let Some(state) = self.history.snapshot(target) {
            self.simulator.load_state(state);
        }
        let mut frame = target;
        while frame < self.current_frame {
            // Overwrite the stale snapshot; re-simulated frames are the new
            // truth for any later rollback.
            let state = self.simulator.save_state();
            self.history.insert_snapshot(frame, state);
            // Regather: confirmed inputs that arrived since the original
            // step replace the stale predictions, and the used-input store
            // must reflect that or the next misprediction check would
            // compare against dead values.
            let inputs = self.gather_inputs(frame);
            self.history.insert_used(frame, inputs.clone());
            self.simulator.step(&inputs);
            frame = frame.saturating_next();
        }
        self.simulator.set_audio_muted(false);
        self.stats.record_rollback((self.current_frame - target) as u32);
    }
}

// #########
// # TESTS #
// #########


#[cfg(test)]
mod scheduler_tests {
    use super::*;

    struct TestConfig;

    impl Config for TestConfig {
        type Input = u8;
        type State = u64;
    }

    #[derive(Default)]
    struct HashSim {
        acc: u64,
    }

    impl Simulator<TestConfig> for HashSim {
        fn step(&mut self, inputs: &[(u8, InputStatus)]) {
            for (bits, _) in inputs {
                self.acc = self.acc.wrapping_mul(31).wrapping_add(u64::from(*bits) + 1);
            }
        }

        fn save_state(&mut self) -> u64 {
            self.acc
        }

        fn load_state(&mut self, state: &u64) {
            self.acc = *state;
        }

        fn render(&mut self) {}
    }

    #[derive(Default)]
    struct NullHost {
        sent: Vec<(Frame, u8)>,
    }

    impl Host<TestConfig> for NullHost {
        fn read_local_input(&mut self) -> u8 {
            0
        }

        fn send_local_input(&mut self, frame: Frame, input: u8) {
            self.sent.push((frame, input));
        }
    }

    fn scheduler(num_slots: usize) -> RollbackScheduler<TestConfig, HashSim> {
        RollbackScheduler::new(
            EngineConfig::default(),
            PlayerSlot::new(0),
            num_slots,
            HashSim::default(),
        )
        .unwrap()
    }

    #[test]
    fn construction_rejects_bad_slots() {
        assert!(RollbackScheduler::<TestConfig, _>::new(
            EngineConfig::default(),
            PlayerSlot::new(0),
            0,
            HashSim::default(),
        )
        .is_err());
        assert!(RollbackScheduler::<TestConfig, _>::new(
            EngineConfig::default(),
            PlayerSlot::new(2),
            2,
            HashSim::default(),
        )
        .is_err());
    }

    #[test]
    fn tick_while_stopped_is_a_noop() {
        let mut engine = scheduler(1);
        let mut host = NullHost::default();
        assert_eq!(engine.tick(&mut host).unwrap(), TickOutcome::Stopped);
        assert_eq!(engine.current_frame(), Frame::new(0));
        assert!(host.sent.is_empty());
    }

    #[test]
    fn start_is_idempotent_after_stop() {
        let mut engine = scheduler(1);
        let mut host = NullHost::default();
        engine.start();
        engine.tick(&mut host).unwrap();
        engine.stop();
        assert_eq!(engine.tick(&mut host).unwrap(), TickOutcome::Stopped);
        engine.start();
        engine.start();
        assert_eq!(engine.tick(&mut host).unwrap(), TickOutcome::Stepped);
        assert_eq!(engine.current_frame(), Frame::new(2));
    }

    #[test]
    fn local_input_is_queued_with_delay() {
        let mut engine = scheduler(1);
        let mut host = NullHost::default();
        engine.start();
        engine.tick(&mut host).unwrap();
        assert_eq!(host.sent, vec![(Frame::new(2), 0)]);
    }

    #[test]
    fn single_participant_watermark_advances_with_cap() {
        let mut engine = scheduler(1);
        let mut host = NullHost::default();
        engine.start();
        for _ in 0..10 {
            assert_eq!(engine.tick(&mut host).unwrap(), TickOutcome::Stepped);
        }
        // confirmed = current - 1 + input_delay after the last tick.
        assert_eq!(engine.current_frame(), Frame::new(10));
        assert_eq!(engine.confirmed_frame(), Frame::new(11));
    }

    #[test]
    fn stalls_when_running_ahead_of_silent_peer() {
        let mut engine = scheduler(2);
        let mut host = NullHost::default();
        engine.start();
        let mut stepped = 0;
        for _ in 0..20 {
            if engine.tick(&mut host).unwrap() == TickOutcome::Stepped {
                stepped += 1;
            }
        }
        // With a silent peer (watermark -1) the engine may run at most
        // max_rollback - 1 frames before current - (-1) reaches the limit.
        assert_eq!(stepped, 7);
        assert_eq!(engine.current_frame(), Frame::new(7));
        assert!(engine.stats().stall_count > 0);
    }

    #[test]
    fn remote_echo_of_local_slot_is_ignored() {
        let mut engine = scheduler(2);
        engine
            .receive_remote_input(Frame::new(0), PlayerSlot::new(0), 0xFF)
            .unwrap();
        assert_eq!(engine.history().confirmed_input(Frame::new(0), 0), None);
    }

    #[test]
    fn unknown_slot_is_ignored() {
        let mut engine = scheduler(2);
        engine
            .receive_remote_input(Frame::new(0), PlayerSlot::new(5), 0xFF)
            .unwrap();
        assert_eq!(engine.history().confirmed_len(), 0);
    }

    #[test]
    fn conflicting_redelivery_is_strict_error() {
        let mut engine = scheduler(2);
        engine
            .receive_remote_input(Frame::new(3), PlayerSlot::new(1), 0x01)
            .unwrap();
        let err = engine
            .receive_remote_input(Frame::new(3), PlayerSlot::new(1), 0x02)
            .unwrap_err();
        assert_eq!(
            err,
            RewindError::ConflictingInput {
                frame: Frame::new(3),
                slot: PlayerSlot::new(1),
            }
        );
        // Equal redelivery is merely dropped.
        engine
            .receive_remote_input(Frame::new(3), PlayerSlot::new(1), 0x01)
            .unwrap();
    }

    #[test]
    fn conflicting_redelivery_is_dropped_when_lenient() {
        let mut engine = RollbackScheduler::<TestConfig, _>::new(
            EngineConfig::default().with_strict_inputs(false),
            PlayerSlot::new(0),
            2,
            HashSim::default(),
        )
        .unwrap();
        engine
            .receive_remote_input(Frame::new(3), PlayerSlot::new(1), 0x01)
            .unwrap();
        engine
            .receive_remote_input(Frame::new(3), PlayerSlot::new(1), 0x02)
            .unwrap();
        assert_eq!(
            engine.history().confirmed_input(Frame::new(3), 1),
            Some(0x01)
        );
    }
}
