use super::attempt::{AttemptState, BankTransferInstructions, PaymentAttempt};
use super::status::StatusCode;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TokenizationFailed,
    InitializationFailed,
    ChallengeCancelled,
    ChallengeFailed,
    /// The caller cancelled the attempt while it was polling.
    Abandoned,
}

/// The single terminal result of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Approved { status_code: StatusCode },
    Declined { status_code: StatusCode },
    TimedOut { polls: u32 },
    Failed { kind: FailureKind, message: String },
}

impl PaymentOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        PaymentOutcome::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn terminal_state(&self) -> AttemptState {
        match self {
            PaymentOutcome::Approved { .. } => AttemptState::Approved,
            PaymentOutcome::Declined { .. } => AttemptState::Declined,
            PaymentOutcome::TimedOut { .. } => AttemptState::TimedOut,
            PaymentOutcome::Failed { .. } => AttemptState::Failed,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            PaymentOutcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// What `PaymentOrchestrator::execute` hands back: the outcome plus the
/// attempt as it stood when it became immutable history.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentResult {
    pub outcome: PaymentOutcome,
    pub attempt: PaymentAttempt,
}

/// Interim state of the settlement poll, one per poll call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "poll", rename_all = "snake_case")]
pub enum PollUpdate {
    Pending { attempt: u32, status_code: StatusCode },
    Approved { attempt: u32, status_code: StatusCode },
    Declined { attempt: u32, status_code: StatusCode },
    TimedOut { attempt: u32 },
    Error { attempt: u32, message: String },
}

/// Progress emitted while an attempt runs, so a UI can follow along.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AttemptEvent {
    StateChanged { state: AttemptState },
    BankTransferReady { instructions: BankTransferInstructions },
    ChallengeBypassed,
    Poll { update: PollUpdate },
}

pub type ProgressFn = Arc<dyn Fn(AttemptEvent) + Send + Sync>;

/// A listener that ignores everything.
pub fn silent() -> ProgressFn {
    Arc::new(|_| {})
}
