use super::money::{Amount, Country, Currency};
use super::token::Credential;
use crate::error::PaymentError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// One payment-method line item: its own amount, instrument and installment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLine {
    pub amount: Amount,
    pub credential: Credential,
    #[serde(default = "single_installment")]
    pub installments: u8,
    #[serde(default)]
    pub save: bool,
}

fn single_installment() -> u8 {
    1
}

impl PaymentLine {
    pub fn new(amount: Amount, credential: Credential) -> Self {
        Self {
            amount,
            credential,
            installments: 1,
            save: false,
        }
    }

    pub fn with_installments(mut self, installments: u8) -> Self {
        self.installments = installments;
        self
    }

    pub fn saving(mut self) -> Self {
        self.save = true;
        self
    }
}

/// Everything the caller hands to the orchestrator for one payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub currency: Currency,
    pub country: Country,
    pub lines: Vec<PaymentLine>,
    #[serde(default)]
    pub customer: Option<Customer>,
    /// Overrides the configured step-up policy for this attempt.
    #[serde(default)]
    pub step_up: Option<bool>,
    #[serde(default)]
    pub partner_unique_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl PaymentRequest {
    pub fn single(
        amount: Amount,
        currency: Currency,
        country: Country,
        credential: Credential,
    ) -> Self {
        Self {
            currency,
            country,
            lines: vec![PaymentLine::new(amount, credential)],
            customer: None,
            step_up: None,
            partner_unique_id: None,
            session_id: None,
        }
    }

    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer = Some(customer);
        self
    }

    pub fn with_step_up(mut self, enabled: bool) -> Self {
        self.step_up = Some(enabled);
        self
    }

    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.lines.is_empty() {
            return Err(PaymentError::ValidationError(
                "A payment needs at least one line".to_string(),
            ));
        }
        if self.lines.iter().any(|line| line.installments == 0) {
            return Err(PaymentError::ValidationError(
                "Installments must be at least 1".to_string(),
            ));
        }
        if self.lines.len() > 1
            && self
                .lines
                .iter()
                .any(|line| matches!(line.credential, Credential::BankTransfer))
        {
            return Err(PaymentError::ValidationError(
                "Bank transfer cannot be combined with other lines".to_string(),
            ));
        }
        Ok(())
    }
}
