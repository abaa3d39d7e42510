//! Shared stubs for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use netrewind::net::messages::{ClientMessage, ServerMessage};
use netrewind::prelude::*;

/// Test configuration: 8-bit inputs, tiny hashable state.
pub struct StubConfig;

impl Config for StubConfig {
    type Input = u8;
    type State = StubState;
}

/// The full mutable state of [`StubSim`]; everything `step` consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StubState {
    pub frame: i32,
    pub accum: u64,
}

impl StubState {
    pub fn initial() -> Self {
        Self { frame: 0, accum: 0 }
    }
}

/// A deterministic simulator whose state depends on every input bit of
/// every frame, so any wrong or re-ordered input changes the state hash.
pub struct StubSim {
    pub state: StubState,
    pub muted: bool,
    pub mute_toggles: usize,
    pub steps: usize,
}

impl StubSim {
    pub fn new() -> Self {
        Self {
            state: StubState::initial(),
            muted: false,
            mute_toggles: 0,
            steps: 0,
        }
    }
}

impl Default for StubSim {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator<StubConfig> for StubSim {
    fn step(&mut self, inputs: &[(u8, InputStatus)]) {
        // Only input bits feed the state; Confirmed vs Predicted must not,
        // or re-simulation with the same values would diverge.
        let mut mix: u64 = 0;
        for (bits, _) in inputs {
            mix = mix.wrapping_mul(257).wrapping_add(u64::from(*bits) + 1);
        }
        self.state.accum = self
            .state
            .accum
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(mix);
        self.state.frame += 1;
        self.steps += 1;
    }

    fn save_state(&mut self) -> StubState {
        self.state
    }

    fn load_state(&mut self, state: &StubState) {
        self.state = *state;
    }

    fn render(&mut self) {}

    fn set_audio_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.mute_toggles += 1;
    }
}

/// A host feeding a constant (settable) local input and recording
/// everything the engine hands back.
pub struct ScriptedHost {
    pub local_input: u8,
    pub sent: Vec<(Frame, u8)>,
    pub last_stats: Option<RollbackStats>,
}

impl ScriptedHost {
    pub fn new(local_input: u8) -> Self {
        Self {
            local_input,
            sent: Vec::new(),
            last_stats: None,
        }
    }
}

impl Host<StubConfig> for ScriptedHost {
    fn read_local_input(&mut self) -> u8 {
        self.local_input
    }

    fn send_local_input(&mut self, frame: Frame, input: u8) {
        self.sent.push((frame, input));
    }

    fn on_stats(&mut self, stats: &RollbackStats) {
        self.last_stats = Some(*stats);
    }
}

/// An in-memory relay channel for driving [`MatchSession`] in tests.
/// Clones share the same inbox/outbox.
#[derive(Clone, Default)]
pub struct ScriptTransport {
    inner: Arc<Mutex<ScriptInner>>,
}

#[derive(Default)]
struct ScriptInner {
    inbox: VecDeque<ServerMessage<u8>>,
    outbox: Vec<ClientMessage<u8>>,
    closed: bool,
}

impl ScriptTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a record as if the relay had sent it.
    pub fn push(&self, record: ServerMessage<u8>) {
        self.inner.lock().inbox.push_back(record);
    }

    /// Everything the session has sent so far.
    pub fn sent(&self) -> Vec<ClientMessage<u8>> {
        self.inner.lock().outbox.clone()
    }

    /// Simulates the relay channel closing.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }
}

impl RelayTransport<StubConfig> for ScriptTransport {
    fn send(&mut self, record: &ClientMessage<u8>) -> RewindResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(RewindError::TransportClosed);
        }
        inner.outbox.push(record.clone());
        Ok(())
    }

    fn drain(&mut self) -> RewindResult<Vec<ServerMessage<u8>>> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(RewindError::TransportClosed);
        }
        Ok(inner.inbox.drain(..).collect())
    }
}

/// Builds a started two-slot scheduler with the local player in slot 0.
pub fn two_player_engine() -> RollbackScheduler<StubConfig, StubSim> {
    let mut engine = RollbackScheduler::new(
        EngineConfig::default(),
        PlayerSlot::new(0),
        2,
        StubSim::new(),
    )
    .expect("engine construction");
    engine.start();
    engine
}

/// The history bound from the engine's retention contract.
pub fn history_bound(config: &EngineConfig) -> usize {
    config.max_rollback() + config.input_delay() + 2
}

/// Asserts the bounded-memory invariant on all three stores.
pub fn assert_history_bounded(engine: &RollbackScheduler<StubConfig, StubSim>) {
    let bound = history_bound(engine.config());
    assert!(
        engine.history().confirmed_len() <= bound,
        "confirmed store holds {} frames, bound {}",
        engine.history().confirmed_len(),
        bound
    );
    assert!(
        engine.history().used_len() <= bound,
        "used store holds {} frames, bound {}",
        engine.history().used_len(),
        bound
    );
    assert!(
        engine.history().snapshot_len() <= bound,
        "snapshot store holds {} frames, bound {}",
        engine.history().snapshot_len(),
        bound
    );
}
