use crate::domain::attempt::AttemptState;
use thiserror::Error;

/// Failure reported by a [`GatewayClient`](crate::domain::ports::GatewayClient) call.
///
/// Transport and parsing problems collapse into `Network`; a response that
/// parsed fine but carried a non-success code becomes `Rejected` with the
/// gateway's own message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("gateway rejected request with code {code}: {message}")]
    Rejected { code: String, message: String },
}

impl GatewayError {
    /// The message shown to the caller. Gateway rejections are passed through untouched.
    pub fn caller_message(&self) -> &str {
        match self {
            GatewayError::Network(message) => message,
            GatewayError::Rejected { message, .. } => message,
        }
    }
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: AttemptState, to: AttemptState },
}

pub type Result<T> = std::result::Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_is_verbatim() {
        let err = GatewayError::Rejected {
            code: "99".to_string(),
            message: "Cartão recusado pelo emissor".to_string(),
        };
        assert_eq!(err.caller_message(), "Cartão recusado pelo emissor");
        assert!(err.to_string().contains("code 99"));
    }

    #[test]
    fn test_gateway_error_converts_into_payment_error() {
        let err: PaymentError = GatewayError::Network("connection reset".to_string()).into();
        assert!(matches!(err, PaymentError::GatewayError(GatewayError::Network(_))));
    }
}
