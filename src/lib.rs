//! # netrewind
//!
//! A rollback synchronization engine for peer-to-peer real-time multiplayer
//! games, written in 100% safe Rust.
//!
//! Every participant in a match runs the same deterministic simulator in
//! lockstep. The engine hides network latency by speculatively executing
//! frames with predicted remote inputs, detecting mispredictions when the
//! authoritative inputs arrive, and rewinding + re-simulating the affected
//! frames. Given identical inputs, every participant's state at a given
//! frame number is bit-identical — determinism is the only authority.
//!
//! The engine is ignorant of which game is running: games plug in through
//! the [`Simulator`] adapter trait (`step` / `save_state` / `load_state` /
//! `render`), and the environment plugs in through the [`Host`] trait
//! (local input capture, input broadcast, stats).
//!
//! ## Quick start
//!
//! ```
//! use netrewind::{
//!     Config, EngineConfig, Frame, Host, InputStatus, PlayerSlot, RewindResult,
//!     RollbackScheduler, Simulator,
//! };
//!
//! struct Demo;
//! impl Config for Demo {
//!     type Input = u8;
//!     type State = u64;
//! }
//!
//! // A trivial deterministic simulator: state is a rolling hash of inputs.
//! #[derive(Default)]
//! struct Counter {
//!     acc: u64,
//! }
//! impl Simulator<Demo> for Counter {
//!     fn step(&mut self, inputs: &[(u8, InputStatus)]) {
//!         for (bits, _) in inputs {
//!             self.acc = self.acc.wrapping_mul(31).wrapping_add(u64::from(*bits));
//!         }
//!     }
//!     fn save_state(&mut self) -> u64 {
//!         self.acc
//!     }
//!     fn load_state(&mut self, state: &u64) {
//!         self.acc = *state;
//!     }
//!     fn render(&mut self) {}
//! }
//!
//! struct Silent;
//! impl Host<Demo> for Silent {
//!     fn read_local_input(&mut self) -> u8 {
//!         0
//!     }
//!     fn send_local_input(&mut self, _frame: Frame, _input: u8) {}
//! }
//!
//! # fn main() -> RewindResult<()> {
//! let mut engine = RollbackScheduler::<Demo, _>::new(
//!     EngineConfig::default(),
//!     PlayerSlot::new(0),
//!     1,
//!     Counter::default(),
//! )?;
//! engine.start();
//! engine.tick(&mut Silent)?;
//! assert_eq!(engine.current_frame(), Frame::new(1));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use error::{ConfigErrorKind, InvalidFrameReason, RewindError};
pub use harness::SyncCheckSession;
pub use pacer::{Clock, FramePacer, SystemClock};
pub use predictor::{Blank, HoldLast, PredictionStrategy};
pub use scheduler::{EngineConfig, Host, RollbackScheduler, TickOutcome};
pub use session::{
    MatchSession, MatchStart, RelayTransport, SessionEvent, SessionPhase, SimulatorFactory,
};
pub use simulator::Simulator;
pub use stats::RollbackStats;

/// A specialized `Result` type for netrewind operations.
///
/// Named `RewindResult` rather than `Result` so that glob imports of the
/// [`prelude`] never shadow `std::result::Result`.
pub type RewindResult<T, E = RewindError> = std::result::Result<T, E>;

/// State checksum utilities for the optional non-determinism testing hook.
pub mod checksum;
/// Frame-keyed history stores backing rollback.
pub mod history;
/// Wall-clock pacing of the tick loop.
pub mod pacer;
/// Convenient re-exports for common usage.
pub mod prelude;
/// Input prediction strategies.
pub mod predictor;
/// Deterministic PRNG for simulator adapters that derive entropy from the
/// shared match seed.
pub mod rng;
/// Structured reporting for contract violations the engine recovers from.
pub mod telemetry;

#[doc(hidden)]
pub mod error;
mod harness;
mod scheduler;
mod session;
mod simulator;
mod stats;

/// Relay protocol records and codec.
pub mod net {
    /// JSON codec for relay records.
    pub mod codec;
    /// Key-tagged message records exchanged with the relay.
    pub mod messages;
}

// #############
// # CONSTANTS #
// #############

/// Internally, -1 represents no frame / invalid frame.
pub const NULL_FRAME: i32 = -1;

/// A frame is a single step of deterministic simulation.
///
/// Frame numbers start at 0, are advanced monotonically by the scheduler and
/// are never reused. The special value [`NULL_FRAME`] (-1) represents "no
/// frame": an uninitialized watermark, or a peer from which nothing has been
/// received yet.
///
/// `Frame` is a newtype wrapper around `i32` so that frame numbers cannot be
/// accidentally mixed with other integers.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Frame(i32);

impl Frame {
    /// The null frame constant, representing "no frame".
    pub const NULL: Self = Self(NULL_FRAME);

    /// Creates a new `Frame` from an `i32` value.
    ///
    /// This does not validate the frame number; use [`Frame::is_valid`] to
    /// check for non-negativity.
    #[inline]
    #[must_use]
    pub const fn new(frame: i32) -> Self {
        Self(frame)
    }

    /// Returns the underlying `i32` value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns `true` if this frame is the null frame.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == NULL_FRAME
    }

    /// Returns `true` if this frame is valid (non-negative).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Adds a value to this frame, saturating at the numeric bounds.
    ///
    /// At 60 fps it takes over a year of continuous play to reach
    /// `i32::MAX`; the engine still prefers saturation over panicking.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: i32) -> Self {
        Self(self.0.saturating_add(rhs))
    }

    /// Subtracts a value from this frame, saturating at the numeric bounds.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: i32) -> Self {
        Self(self.0.saturating_sub(rhs))
    }

    /// Returns the next frame, saturating at `i32::MAX`.
    #[inline]
    #[must_use]
    pub const fn saturating_next(self) -> Self {
        self.saturating_add(1)
    }

    /// Returns the ring-buffer slot for this frame, or `None` if the frame
    /// is negative or `capacity` is zero.
    #[inline]
    #[must_use]
    pub const fn buffer_index(self, capacity: usize) -> Option<usize> {
        if self.0 >= 0 && capacity > 0 {
            Some(self.0 as usize % capacity)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "NULL_FRAME")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::ops::Add<i32> for Frame {
    type Output = Self;

    #[inline]
    fn add(self, rhs: i32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl std::ops::AddAssign<i32> for Frame {
    #[inline]
    fn add_assign(&mut self, rhs: i32) {
        self.0 += rhs;
    }
}

impl std::ops::Sub<i32> for Frame {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: i32) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl std::ops::SubAssign<i32> for Frame {
    #[inline]
    fn sub_assign(&mut self, rhs: i32) {
        self.0 -= rhs;
    }
}

impl std::ops::Sub<Self> for Frame {
    type Output = i32;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl From<i32> for Frame {
    #[inline]
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<Frame> for i32 {
    #[inline]
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

impl PartialEq<i32> for Frame {
    #[inline]
    fn eq(&self, other: &i32) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<i32> for Frame {
    #[inline]
    fn partial_cmp(&self, other: &i32) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(other)
    }
}

/// A controller slot in a match.
///
/// The set of slots for a match is fixed at construction; slot `i` is bound
/// to the `i`-th entry of the ordered roster announced by the relay when the
/// match starts. Exactly one slot is local to each participant.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct PlayerSlot(usize);

impl PlayerSlot {
    /// Creates a new `PlayerSlot` from a `usize` value.
    ///
    /// This does not validate the slot against a match; use
    /// [`is_valid_for`](Self::is_valid_for) to check against the slot count.
    #[inline]
    #[must_use]
    pub const fn new(slot: usize) -> Self {
        Self(slot)
    }

    /// Returns the underlying `usize` value.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Returns `true` if this slot exists in a match with `num_slots`
    /// controller slots.
    #[inline]
    #[must_use]
    pub const fn is_valid_for(self, num_slots: usize) -> bool {
        self.0 < num_slots
    }
}

impl std::fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlayerSlot({})", self.0)
    }
}

impl From<usize> for PlayerSlot {
    #[inline]
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl From<PlayerSlot> for usize {
    #[inline]
    fn from(slot: PlayerSlot) -> Self {
        slot.0
    }
}

/// Compile time parameterization for the engine.
pub trait Config: 'static {
    /// The bit-packed input type for one player and one frame. This is the
    /// only game-related data transmitted between peers.
    ///
    /// The engine never interprets individual bits; inputs are only compared
    /// for equality. The width is the simulator's choice (`u8` for small
    /// games, `u16` for emulator-scale controllers). The [`Default`] value
    /// represents "all bits clear".
    type Input: Copy + PartialEq + Default + Debug + Serialize + DeserializeOwned + Send + Sync;

    /// The opaque state snapshot type. Captured by `save_state`, owned by
    /// the history store until pruned or overwritten, and handed back to
    /// `load_state` by reference during rollback.
    type State: Clone;
}

/// Whether a gathered input was authoritative or speculative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputStatus {
    /// The input for this player and frame is an actual received input.
    Confirmed,
    /// The input for this player and frame was predicted.
    Predicted,
}

impl std::fmt::Display for InputStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => write!(f, "Confirmed"),
            Self::Predicted => write!(f, "Predicted"),
        }
    }
}

/// Stack-allocated input map for one frame, indexed by [`PlayerSlot`].
///
/// Uses [`smallvec::SmallVec`] so matches with up to 4 players never touch
/// the heap in the per-tick gather path.
pub type InputVec<I> = smallvec::SmallVec<[(I, InputStatus); 4]>;

// #########
// # TESTS #
// #########
