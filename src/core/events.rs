use crate::reporting::model::Finding;

/// Lifecycle of one target within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    New,
    BaselineLearning,
    Scanning,
    /// The instability detector fired, or the baseline phase failed;
    /// remaining work was cancelled and findings suppressed.
    UnstableAborted,
    /// Wordlist exhausted normally.
    Completed,
    /// The target failed the aliveness check and was never scanned.
    Skipped,
}

/// Stream of engine events, for progress display and result consumers.
///
/// Per-session `Progress.advanced` values always sum to the wordlist
/// length: one event per probed candidate, plus a single catch-up event
/// when a session ends early.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Progress { target: String, advanced: u64 },
    Finding(Finding),
    TargetFinished { target: String, state: TargetState },
}
