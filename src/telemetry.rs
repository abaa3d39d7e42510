//! Structured reporting for contract violations the engine recovers from.
//!
//! The engine prefers local recovery (discard + log) over propagation: late
//! out-of-horizon inputs, garbage from the relay, and anomalous rollback
//! targets are all dropped without failing the match. Instead of bare
//! `tracing::warn!` calls scattered through the hot path, those events are
//! structured [`Violation`] records that can be
//!
//! - logged via `tracing` (default behavior), or
//! - collected programmatically, which is how the integration tests assert
//!   that scenarios like a past-horizon misprediction are *logged* rather
//!   than acted on.

use std::sync::Arc;

use parking_lot::Mutex;

/// How severe a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViolationSeverity {
    /// Expected under degraded network conditions; informational.
    Warning,
    /// A peer or the relay broke the protocol; the engine recovered.
    Error,
    /// An internal invariant failed; indicates a bug in the engine.
    Critical,
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Which part of the engine contract was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ViolationKind {
    /// Frame bookkeeping: watermarks, rollback targets, tick ordering.
    FrameSync,
    /// Peer input delivery: duplicates, unknown slots, stale frames.
    InputProtocol,
    /// Relay channel: malformed or unexpected records.
    Relay,
    /// An internal invariant failed.
    Internal,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrameSync => write!(f, "frame-sync"),
            Self::InputProtocol => write!(f, "input-protocol"),
            Self::Relay => write!(f, "relay"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// A single recorded contract violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Severity of the violation.
    pub severity: ViolationSeverity,
    /// Contract area the violation belongs to.
    pub kind: ViolationKind,
    /// Human-readable description.
    pub message: String,
    /// `file:line` of the reporting site.
    pub location: &'static str,
}

impl Violation {
    /// Creates a new violation record.
    pub fn new(
        severity: ViolationSeverity,
        kind: ViolationKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
        }
    }
}

/// Receives violation records as they are reported.
pub trait ViolationObserver: Send + Sync {
    /// Called once per reported violation.
    fn on_violation(&self, violation: &Violation);
}

/// The default observer: forwards violations to `tracing` at a level
/// matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &Violation) {
        match violation.severity {
            ViolationSeverity::Warning => tracing::warn!(
                kind = %violation.kind,
                location = violation.location,
                "{}",
                violation.message
            ),
            ViolationSeverity::Error | ViolationSeverity::Critical => tracing::error!(
                kind = %violation.kind,
                severity = %violation.severity,
                location = violation.location,
                "{}",
                violation.message
            ),
        }
    }
}

/// An observer that stores every violation, for tests.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    violations: Mutex<Vec<Violation>>,
}

impl CollectingObserver {
    /// Creates an empty collecting observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all violations collected so far.
    #[must_use]
    pub fn violations(&self) -> Vec<Violation> {
        self.violations.lock().clone()
    }

    /// Returns how many violations of the given kind have been collected.
    #[must_use]
    pub fn count_of(&self, kind: ViolationKind) -> usize {
        self.violations
            .lock()
            .iter()
            .filter(|v| v.kind == kind)
            .count()
    }

    /// Discards all collected violations.
    pub fn clear(&self) {
        self.violations.lock().clear();
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &Violation) {
        self.violations.lock().push(violation.clone());
    }
}

/// A shareable observer handle. Components that report violations hold one
/// of these; the default forwards to [`TracingObserver`].
pub type ObserverHandle = Arc<dyn ViolationObserver>;

/// Returns the default observer handle (tracing-backed).
#[must_use]
pub fn default_observer() -> ObserverHandle {
    Arc::new(TracingObserver)
}

/// Reports a violation to an [`ObserverHandle`], capturing the call site.
///
/// ```
/// use netrewind::report_violation;
/// use netrewind::telemetry::{default_observer, ViolationKind, ViolationSeverity};
///
/// let observer = default_observer();
/// report_violation!(
///     observer,
///     ViolationSeverity::Warning,
///     ViolationKind::InputProtocol,
///     "late input for frame {} dropped",
///     41
/// );
/// ```
#[macro_export]
macro_rules! report_violation {
    ($observer:expr, $severity:expr, $kind:expr, $msg:literal) => {{
        $crate::telemetry::ViolationObserver::on_violation(
            $observer.as_ref(),
            &$crate::telemetry::Violation::new(
                $severity,
                $kind,
                $msg,
                concat!(file!(), ":", line!()),
            ),
        );
    }};
    ($observer:expr, $severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        $crate::telemetry::ViolationObserver::on_violation(
            $observer.as_ref(),
            &$crate::telemetry::Violation::new(
                $severity,
                $kind,
                format!($fmt, $($arg)+),
                concat!(file!(), ":", line!()),
            ),
        );
    }};
}

// #########
// # TESTS #
// #########

#[cfg(test)]
mod telemetry_tests {
    use super::*;

    #[test]
    fn collecting_observer_records() {
        let concrete = Arc::new(CollectingObserver::new());
        let handle: ObserverHandle = concrete.clone();
        report_violation!(
            handle,
            ViolationSeverity::Error,
            ViolationKind::InputProtocol,
            "dropped"
        );
        let violations = concrete.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::InputProtocol);
        assert_eq!(violations[0].severity, ViolationSeverity::Error);
        assert!(violations[0].location.contains("telemetry.rs"));
    }

    #[test]
    fn count_of_filters_by_kind() {
        let concrete = Arc::new(CollectingObserver::new());
        let handle: ObserverHandle = concrete.clone();
        report_violation!(
            handle,
            ViolationSeverity::Warning,
            ViolationKind::FrameSync,
            "a"
        );
        report_violation!(
            handle,
            ViolationSeverity::Warning,
            ViolationKind::Relay,
            "b"
        );
        assert_eq!(concrete.count_of(ViolationKind::FrameSync), 1);
        assert_eq!(concrete.count_of(ViolationKind::Relay), 1);
        assert_eq!(concrete.count_of(ViolationKind::Internal), 0);
        concrete.clear();
        assert!(concrete.violations().is_empty());
    }

    #[test]
    fn severity_ordering() {
        assert!(ViolationSeverity::Warning < ViolationSeverity::Error);
        assert!(ViolationSeverity::Error < ViolationSeverity::Critical);
    }
}
