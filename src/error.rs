use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::{Frame, PlayerSlot};

// Structured error types: debugging data is stored as plain fields (cheap,
// no allocation on the hot path) and formatted lazily in Display.

/// Why an [`EngineConfig`](crate::EngineConfig) value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ConfigErrorKind {
    /// `max_rollback` must be at least 1.
    ZeroMaxRollback,
    /// `target_fps` must be at least 1.
    ZeroFps,
    /// `input_delay` exceeds the supported maximum.
    ExcessiveInputDelay {
        /// The rejected delay.
        delay: usize,
        /// The maximum supported delay.
        max: usize,
    },
}

impl Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroMaxRollback => write!(f, "max_rollback must be at least 1"),
            Self::ZeroFps => write!(f, "target_fps must be at least 1"),
            Self::ExcessiveInputDelay { delay, max } => {
                write!(f, "input_delay {} exceeds maximum {}", delay, max)
            },
        }
    }
}

/// Why a frame number was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InvalidFrameReason {
    /// Frame is negative or `NULL_FRAME`.
    Negative,
    /// Frame is not in the past (must be before the current frame).
    NotInPast {
        /// The current frame.
        current_frame: Frame,
    },
    /// No state snapshot is retained for this frame.
    NoSnapshot,
    /// Frame is not confirmed yet.
    NotConfirmed {
        /// The confirmed-frame watermark.
        confirmed_frame: Frame,
    },
}

impl Display for InvalidFrameReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "frame must be non-negative"),
            Self::NotInPast { current_frame } => {
                write!(f, "frame must be in the past (current: {})", current_frame)
            },
            Self::NoSnapshot => write!(f, "no snapshot retained for frame"),
            Self::NotConfirmed { confirmed_frame } => {
                write!(f, "frame is not confirmed yet (watermark: {})", confirmed_frame)
            },
        }
    }
}

/// All errors this library can return. Most fallible API functions return a
/// [`RewindResult`](crate::RewindResult).
///
/// The enum is `#[non_exhaustive]`: new variants may be added in future
/// versions, so always include a wildcard arm when matching.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RewindError {
    /// A tuning parameter was rejected at construction.
    InvalidConfig {
        /// Which parameter and why.
        kind: ConfigErrorKind,
    },
    /// An invalid frame number was provided.
    InvalidFrame {
        /// The offending frame.
        frame: Frame,
        /// Why it was rejected.
        reason: InvalidFrameReason,
    },
    /// A player slot outside the fixed slot set was provided.
    InvalidSlot {
        /// The offending slot.
        slot: PlayerSlot,
        /// The number of slots in the match.
        num_slots: usize,
    },
    /// A peer redelivered a confirmed input for a (frame, slot) pair with a
    /// different value. The deterministic contract is broken; in strict mode
    /// this surfaces as an error, in lenient mode it is logged and dropped.
    ConflictingInput {
        /// The frame of the conflicting delivery.
        frame: Frame,
        /// The slot of the conflicting delivery.
        slot: PlayerSlot,
    },
    /// A [`SyncCheckSession`](crate::SyncCheckSession) resimulated frames
    /// whose checksums did not match the original simulation. The simulator
    /// is non-deterministic; this is fatal for the match.
    MismatchedChecksum {
        /// The frame at which the mismatch was detected.
        current_frame: Frame,
        /// The frames with mismatched checksums (one or more).
        mismatched_frames: Vec<Frame>,
    },
    /// The relay channel closed. The engine stops at the next tick boundary;
    /// the simulator is retained for potential resume.
    TransportClosed,
    /// An operation reserved for the room host was attempted by a guest.
    NotHost,
    /// The request is not valid in the current phase or with the given
    /// parameters.
    InvalidRequest {
        /// What was wrong with the request.
        info: &'static str,
    },
}

impl Display for RewindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { kind } => write!(f, "invalid configuration: {}", kind),
            Self::InvalidFrame { frame, reason } => {
                write!(f, "invalid frame {}: {}", frame, reason)
            },
            Self::InvalidSlot { slot, num_slots } => {
                write!(f, "invalid {} for a match with {} slots", slot, num_slots)
            },
            Self::ConflictingInput { frame, slot } => {
                write!(
                    f,
                    "conflicting confirmed input redelivered for frame {} {}",
                    frame, slot
                )
            },
            Self::MismatchedChecksum {
                current_frame,
                mismatched_frames,
            } => {
                write!(
                    f,
                    "checksum mismatch detected at frame {} for resimulated frames {:?}",
                    current_frame, mismatched_frames
                )
            },
            Self::TransportClosed => write!(f, "relay transport closed"),
            Self::NotHost => write!(f, "operation requires being the room host"),
            Self::InvalidRequest { info } => write!(f, "invalid request: {}", info),
        }
    }
}

impl Error for RewindError {}

impl From<ConfigErrorKind> for RewindError {
    fn from(kind: ConfigErrorKind) -> Self {
        Self::InvalidConfig { kind }
    }
}

// #########
// # TESTS #
// #########
