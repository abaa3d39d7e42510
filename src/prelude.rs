//! Convenient re-exports for common usage.
//!
//! ```
//! use netrewind::prelude::*;
//! ```

pub use crate::net::messages::{
    ClientMessage, GameDescriptor, PlayerId, RoomId, ServerMessage,
};
pub use crate::predictor::{Blank, HoldLast, PredictionStrategy};
pub use crate::session::{
    MatchSession, MatchStart, RelayTransport, SessionEvent, SessionPhase, SimulatorFactory,
};
pub use crate::{
    Config, EngineConfig, Frame, Host, InputStatus, InputVec, PlayerSlot, RewindError,
    RewindResult, RollbackScheduler, RollbackStats, Simulator, SyncCheckSession, TickOutcome,
    NULL_FRAME,
};
pub use crate::{Clock, FramePacer, SystemClock};
