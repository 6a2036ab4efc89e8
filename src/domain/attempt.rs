use super::money::{Amount, Country, Currency};
use super::request::{Customer, PaymentRequest};
use super::token::Credential;
use crate::error::PaymentError;
use serde::{Deserialize, Serialize};

/// Lifecycle of one payment attempt.
///
/// `Approved`, `Declined`, `TimedOut` and `Failed` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Created,
    Tokenizing,
    Tokenized,
    Initiating,
    Initiated,
    CollectingData,
    Challenging,
    Polling,
    Approved,
    Declined,
    TimedOut,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AttemptState::Approved
                | AttemptState::Declined
                | AttemptState::TimedOut
                | AttemptState::Failed
        )
    }

    pub fn can_transition_to(self, next: AttemptState) -> bool {
        use AttemptState::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Created, Tokenizing)
                | (Created, Initiating)
                | (Tokenizing, Tokenized)
                | (Tokenized, Initiating)
                | (Initiating, Initiated)
                | (Initiated, CollectingData)
                | (Initiated, Challenging)
                | (Initiated, Polling)
                | (CollectingData, Challenging)
                | (CollectingData, Polling)
                | (Challenging, Polling)
                | (Polling, Approved)
                | (Polling, Declined)
                | (Polling, TimedOut)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    CardPresent,
    SavedToken,
    WalletToken,
    BankTransfer,
}

impl From<&Credential> for PaymentMethodKind {
    fn from(credential: &Credential) -> Self {
        match credential {
            Credential::Card(_) => PaymentMethodKind::CardPresent,
            Credential::Wallet { .. } => PaymentMethodKind::WalletToken,
            Credential::SavedToken { .. } => PaymentMethodKind::SavedToken,
            Credential::BankTransfer => PaymentMethodKind::BankTransfer,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptIds {
    pub partner_unique_id: String,
    pub payment_key: Option<String>,
    pub method_id: Option<String>,
}

/// A `{key, value}` pair produced by a device-data collection provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub key: String,
    pub value: String,
}

/// Payment instructions for a bank-transfer (QR code) attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransferInstructions {
    pub qr_code: String,
    #[serde(default)]
    pub copy_paste_code: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// One customer-initiated transaction, owned by a single orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttempt {
    pub amount: Amount,
    pub currency: Currency,
    pub country: Country,
    pub method: PaymentMethodKind,
    pub customer: Option<Customer>,
    pub ids: AttemptIds,
    /// A challenge was offered but step-up was disabled for this attempt.
    pub challenge_bypassed: bool,
    pub device_sessions: Vec<SessionDescriptor>,
    pub bank_transfer: Option<BankTransferInstructions>,
    state: AttemptState,
    history: Vec<AttemptState>,
}

impl PaymentAttempt {
    pub fn from_request(request: &PaymentRequest) -> Result<Self, PaymentError> {
        request.validate()?;
        let amount = Amount::total(request.lines.iter().map(|line| &line.amount))?;
        let partner_unique_id = request
            .partner_unique_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(Self {
            amount,
            currency: request.currency.clone(),
            country: request.country.clone(),
            method: PaymentMethodKind::from(&request.lines[0].credential),
            customer: request.customer.clone(),
            ids: AttemptIds {
                partner_unique_id,
                ..AttemptIds::default()
            },
            challenge_bypassed: false,
            device_sessions: Vec::new(),
            bank_transfer: None,
            state: AttemptState::Created,
            history: vec![AttemptState::Created],
        })
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Every state the attempt went through, in order.
    pub fn history(&self) -> &[AttemptState] {
        &self.history
    }

    pub fn visited(&self, state: AttemptState) -> bool {
        self.history.contains(&state)
    }

    pub fn advance(&mut self, next: AttemptState) -> Result<(), PaymentError> {
        if !self.state.can_transition_to(next) {
            return Err(PaymentError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::PaymentLine;
    use rust_decimal_macros::dec;

    fn request() -> PaymentRequest {
        PaymentRequest::single(
            Amount::new(dec!(60.00)).unwrap(),
            Currency::new("BRL").unwrap(),
            Country::new("BR").unwrap(),
            Credential::SavedToken {
                token: "T1".to_string(),
            },
        )
    }

    #[test]
    fn test_attempt_from_request() {
        let mut req = request();
        req.lines.push(PaymentLine::new(
            Amount::new(dec!(40.00)).unwrap(),
            Credential::SavedToken {
                token: "T2".to_string(),
            },
        ));
        let attempt = PaymentAttempt::from_request(&req).unwrap();
        assert_eq!(attempt.amount.value(), dec!(100.00));
        assert_eq!(attempt.method, PaymentMethodKind::SavedToken);
        assert_eq!(attempt.state(), AttemptState::Created);
        assert!(!attempt.ids.partner_unique_id.is_empty());
        assert!(attempt.ids.payment_key.is_none());
    }

    #[test]
    fn test_overflowing_line_total_is_rejected() {
        let line = || {
            PaymentLine::new(
                Amount::new(rust_decimal::Decimal::MAX).unwrap(),
                Credential::SavedToken {
                    token: "T1".to_string(),
                },
            )
        };
        let mut req = request();
        req.lines = vec![line(), line()];
        assert!(matches!(
            PaymentAttempt::from_request(&req),
            Err(PaymentError::ValidationError(message)) if message == "line total overflows"
        ));
    }

    #[test]
    fn test_partner_id_is_kept_when_supplied() {
        let mut req = request();
        req.partner_unique_id = Some("order-42".to_string());
        let attempt = PaymentAttempt::from_request(&req).unwrap();
        assert_eq!(attempt.ids.partner_unique_id, "order-42");
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut attempt = PaymentAttempt::from_request(&request()).unwrap();
        for next in [
            AttemptState::Tokenizing,
            AttemptState::Tokenized,
            AttemptState::Initiating,
            AttemptState::Initiated,
            AttemptState::CollectingData,
            AttemptState::Challenging,
            AttemptState::Polling,
            AttemptState::Approved,
        ] {
            attempt.advance(next).unwrap();
        }
        assert_eq!(attempt.history().len(), 9);
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        let mut attempt = PaymentAttempt::from_request(&request()).unwrap();
        attempt.advance(AttemptState::Failed).unwrap();
        for next in [
            AttemptState::Failed,
            AttemptState::Polling,
            AttemptState::Approved,
            AttemptState::Created,
        ] {
            assert!(matches!(
                attempt.advance(next),
                Err(PaymentError::InvalidTransition { .. })
            ));
        }
        assert_eq!(attempt.state(), AttemptState::Failed);
    }

    #[test]
    fn test_steps_cannot_be_reordered() {
        assert!(!AttemptState::Challenging.can_transition_to(AttemptState::CollectingData));
        assert!(!AttemptState::Created.can_transition_to(AttemptState::Polling));
        assert!(!AttemptState::Tokenizing.can_transition_to(AttemptState::Initiating));
        assert!(AttemptState::Initiated.can_transition_to(AttemptState::Polling));
    }
}
