use serde::{Deserialize, Serialize};
use std::fmt;

/// Gateway status codes that mean the payment settled successfully.
pub const SUCCESS_CODES: [&str; 2] = ["2", "8"];
/// Gateway status codes that mean the payment was refused.
pub const FAILURE_CODES: [&str; 4] = ["4", "5", "A", "N"];

/// Domain-specific settlement status code as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(String);

impl StatusCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_success(&self) -> bool {
        SUCCESS_CODES.contains(&self.as_str())
    }

    pub fn is_failure(&self) -> bool {
        FAILURE_CODES.contains(&self.as_str())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Settlement {
    Approved,
    Declined,
    Pending,
}

/// A single point-in-time read of the settlement state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub confirmed: bool,
    pub status_code: StatusCode,
    pub allow_retry: bool,
}

impl StatusSnapshot {
    /// Pure function of `confirmed` and the status code.
    ///
    /// A confirmed code outside both sets is treated as declined: the payment
    /// is final and it did not settle successfully.
    pub fn classify(&self) -> Settlement {
        match (self.confirmed, self.status_code.is_success()) {
            (false, _) => Settlement::Pending,
            (true, true) => Settlement::Approved,
            (true, false) => Settlement::Declined,
        }
    }

    /// The server wants another poll.
    pub fn should_continue(&self) -> bool {
        !self.confirmed && self.allow_retry
    }
}
