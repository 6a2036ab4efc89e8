use super::attempt::{BankTransferInstructions, PaymentMethodKind};
use super::challenge::ChallengeDescriptor;
use super::money::{Amount, Country, Currency};
use super::request::Customer;
use super::token::AuthenticationSetup;
use serde::Serialize;

/// One payment-method line in an initialization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodLineItem {
    pub method: PaymentMethodKind,
    pub amount: Amount,
    pub token: Option<String>,
    pub installments: u8,
    pub save: bool,
}

/// Request record for `GatewayClient::initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub partner_unique_id: String,
    pub currency: Currency,
    pub country: Country,
    pub amount: Amount,
    pub payment_methods: Vec<MethodLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    /// Reference id of the device-collection session started at tokenization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_reference: Option<String>,
}

/// What a successful initialization tells the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initialization {
    pub payment_key: String,
    pub method_id: String,
    pub challenge: Option<ChallengeDescriptor>,
    pub authentication_setup: Option<AuthenticationSetup>,
    pub bank_transfer: Option<BankTransferInstructions>,
}
