use serde::{Deserialize, Serialize};

use crate::Frame;

/// Diagnostic counters published after every tick through
/// [`Host::on_stats`](crate::Host::on_stats).
///
/// Rollback frequency and depth are the practical "connection quality"
/// signal of a match: frequent deep rollbacks mean predictions keep being
/// wrong for longer stretches, i.e. peer inputs are arriving late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackStats {
    /// The most recently stepped frame.
    pub current_frame: Frame,
    /// The confirmed-frame watermark: at or below it, all players' inputs
    /// are known and no further misprediction is possible.
    pub confirmed_frame: Frame,
    /// Cumulative number of rollbacks executed this match.
    pub rollback_count: u64,
    /// The deepest rollback observed, in frames.
    pub max_rollback_depth: u32,
    /// Number of ticks skipped because the engine would have run more than
    /// `max_rollback` frames ahead of its slowest peer.
    pub stall_count: u64,
}

impl Default for RollbackStats {
    fn default() -> Self {
        Self {
            current_frame: Frame::new(0),
            confirmed_frame: Frame::NULL,
            rollback_count: 0,
            max_rollback_depth: 0,
            stall_count: 0,
        }
    }
}

impl RollbackStats {
    /// Records one executed rollback of the given depth.
    pub(crate) fn record_rollback(&mut self, depth: u32) {
        self.rollback_count += 1;
        self.max_rollback_depth = self.max_rollback_depth.max(depth);
    }
}
