//! JSON records exchanged with the payment gateway, and their conversion into
//! domain records. Every gateway adapter goes through these so that response
//! codes are checked the same way everywhere.

use crate::domain::attempt::BankTransferInstructions;
use crate::domain::challenge::ChallengeDescriptor;
use crate::domain::gateway::Initialization;
use crate::domain::status::{StatusCode, StatusSnapshot};
use crate::domain::token::{AuthenticationSetup, TokenDescriptor};
use crate::error::GatewayError;
use serde::{Deserialize, Deserializer, Serialize};

/// Response code the gateway uses for success on tokenize and initialize.
pub const SUCCESS_CODE: i64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationSetupBody {
    pub collection_url: Option<String>,
    pub access_token: Option<String>,
    pub reference_id: Option<String>,
    pub transaction_id: Option<String>,
}

impl AuthenticationSetupBody {
    fn into_domain(self) -> Option<AuthenticationSetup> {
        AuthenticationSetup::from_parts(
            self.collection_url.as_deref(),
            self.access_token.as_deref(),
            self.reference_id.as_deref(),
            self.transaction_id.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeResponseBody {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub authentication_setup: Option<AuthenticationSetupBody>,
}

impl TokenizeResponseBody {
    pub fn success(token: &str) -> Self {
        Self {
            code: SUCCESS_CODE,
            token: Some(token.to_string()),
            ..Self::default()
        }
    }

    pub fn into_descriptor(self) -> Result<TokenDescriptor, GatewayError> {
        check_code(self.code, self.message, "Tokenization rejected")?;
        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GatewayError::Network("tokenize response has no token".to_string()))?;
        Ok(TokenDescriptor {
            token,
            brand: self.brand,
            authentication_setup: self
                .authentication_setup
                .and_then(AuthenticationSetupBody::into_domain),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeBody {
    pub url: Option<String>,
    pub payload: Option<String>,
    pub term_url: Option<String>,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponseBody {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub payment_key: Option<String>,
    #[serde(default)]
    pub method_id: Option<String>,
    #[serde(default)]
    pub challenge: Option<ChallengeBody>,
    #[serde(default)]
    pub authentication_setup: Option<AuthenticationSetupBody>,
    #[serde(default)]
    pub bank_transfer: Option<BankTransferInstructions>,
}

impl InitializeResponseBody {
    pub fn success(payment_key: &str, method_id: &str) -> Self {
        Self {
            code: SUCCESS_CODE,
            payment_key: Some(payment_key.to_string()),
            method_id: Some(method_id.to_string()),
            ..Self::default()
        }
    }

    pub fn into_initialization(self) -> Result<Initialization, GatewayError> {
        check_code(self.code, self.message, "Payment initialization rejected")?;
        let missing = |field: &str| GatewayError::Network(format!("initialize response has no {field}"));
        let payment_key = self.payment_key.ok_or_else(|| missing("paymentKey"))?;
        let method_id = self.method_id.ok_or_else(|| missing("methodId"))?;
        let challenge = self.challenge.and_then(|c| {
            ChallengeDescriptor::from_parts(
                c.url.as_deref(),
                c.payload.as_deref(),
                c.term_url.as_deref(),
                c.correlation_id.as_deref(),
            )
        });
        Ok(Initialization {
            payment_key,
            method_id,
            challenge,
            authentication_setup: self
                .authentication_setup
                .and_then(AuthenticationSetupBody::into_domain),
            bank_transfer: self.bank_transfer,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponseBody {
    pub confirmed: bool,
    #[serde(deserialize_with = "string_or_number")]
    pub status_code: String,
    pub allow_retry: bool,
}

impl StatusResponseBody {
    pub fn new(confirmed: bool, status_code: &str, allow_retry: bool) -> Self {
        Self {
            confirmed,
            status_code: status_code.to_string(),
            allow_retry,
        }
    }

    pub fn into_snapshot(self) -> StatusSnapshot {
        StatusSnapshot {
            confirmed: self.confirmed,
            status_code: StatusCode::new(self.status_code),
            allow_retry: self.allow_retry,
        }
    }
}

fn check_code(code: i64, message: Option<String>, fallback: &str) -> Result<(), GatewayError> {
    if code == SUCCESS_CODE {
        Ok(())
    } else {
        Err(GatewayError::Rejected {
            code: code.to_string(),
            message: message.unwrap_or_else(|| fallback.to_string()),
        })
    }
}

/// Status codes arrive as `"2"` from some endpoints and `2` from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}
