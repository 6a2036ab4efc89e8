use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Raw card data as typed by the customer. Never logged in clear.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCredential {
    pub number: String,
    pub holder_name: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub cvv: String,
}

impl CardCredential {
    /// Last four digits of the card number, for display and logging.
    pub fn last_four(&self) -> &str {
        let digits = self.number.trim();
        let start = digits.len().saturating_sub(4);
        digits.get(start..).unwrap_or("")
    }
}

impl fmt::Debug for CardCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardCredential")
            .field("number", &format_args!("**** {}", self.last_four()))
            .field("holder_name", &self.holder_name)
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("cvv", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletProvider {
    ApplePay,
    GooglePay,
}

/// The opaque token a native wallet sheet hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletCredential {
    pub provider: WalletProvider,
    pub payload: String,
}

/// What the customer paid with, before tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    /// Card data entered in the app.
    Card(CardCredential),
    /// A wallet sheet must be presented to obtain the token.
    Wallet { provider: WalletProvider },
    /// A token saved by an earlier attempt; no tokenization needed.
    SavedToken { token: String },
    /// Bank transfer paid through a QR code; nothing to tokenize.
    BankTransfer,
}

impl Credential {
    pub fn needs_tokenization(&self) -> bool {
        matches!(self, Credential::Card(_) | Credential::Wallet { .. })
    }
}

/// Request record for `GatewayClient::tokenize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenizeRequest {
    Card {
        card: CardCredential,
        session_id: String,
    },
    Wallet {
        wallet: WalletCredential,
        session_id: String,
    },
}

/// Device-fingerprinting setup returned alongside a token.
///
/// Only exists when all four fields were present in the response; a partial
/// block is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationSetup {
    pub collection_url: Url,
    pub access_token: String,
    pub reference_id: String,
    pub transaction_id: String,
}

impl AuthenticationSetup {
    pub fn from_parts(
        collection_url: Option<&str>,
        access_token: Option<&str>,
        reference_id: Option<&str>,
        transaction_id: Option<&str>,
    ) -> Option<Self> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|s| !s.is_empty())
        }
        let collection_url = Url::parse(present(collection_url)?).ok()?;
        Some(Self {
            collection_url,
            access_token: present(access_token)?.to_string(),
            reference_id: present(reference_id)?.to_string(),
            transaction_id: present(transaction_id)?.to_string(),
        })
    }
}

/// Result of a successful tokenization. Consumed once to build the
/// initialization request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub token: String,
    pub brand: Option<String>,
    pub authentication_setup: Option<AuthenticationSetup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> CardCredential {
        CardCredential {
            number: "4111111111111111".to_string(),
            holder_name: "Maria Silva".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: "123".to_string(),
        }
    }

    #[test]
    fn test_card_debug_is_masked() {
        let rendered = format!("{:?}", card());
        assert!(rendered.contains("**** 1111"));
        assert!(!rendered.contains("4111111111111111"));
        assert!(!rendered.contains("123\""));
    }

    #[test]
    fn test_authentication_setup_requires_all_fields() {
        let complete = AuthenticationSetup::from_parts(
            Some("https://centinel.example/collect"),
            Some("jwt"),
            Some("ref-1"),
            Some("tx-1"),
        );
        assert!(complete.is_some());

        let missing_reference = AuthenticationSetup::from_parts(
            Some("https://centinel.example/collect"),
            Some("jwt"),
            None,
            Some("tx-1"),
        );
        assert!(missing_reference.is_none());

        let blank_token = AuthenticationSetup::from_parts(
            Some("https://centinel.example/collect"),
            Some("   "),
            Some("ref-1"),
            Some("tx-1"),
        );
        assert!(blank_token.is_none());

        let bad_url =
            AuthenticationSetup::from_parts(Some("not a url"), Some("jwt"), Some("r"), Some("t"));
        assert!(bad_url.is_none());
    }

    #[test]
    fn test_credential_tokenization_need() {
        assert!(Credential::Card(card()).needs_tokenization());
        assert!(
            Credential::Wallet {
                provider: WalletProvider::ApplePay
            }
            .needs_tokenization()
        );
        assert!(
            !Credential::SavedToken {
                token: "T9".to_string()
            }
            .needs_tokenization()
        );
        assert!(!Credential::BankTransfer.needs_tokenization());
    }

    #[test]
    fn test_credential_json_shape() {
        let json = r#"{"type":"saved_token","token":"T9"}"#;
        let parsed: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            Credential::SavedToken {
                token: "T9".to_string()
            }
        );
    }
}
