use super::wire::{InitializeResponseBody, StatusResponseBody, TokenizeResponseBody};
use crate::domain::attempt::SessionDescriptor;
use crate::domain::gateway::{InitializeRequest, Initialization};
use crate::domain::ports::{
    BrowserError, BrowserLaunch, BrowserResult, BrowserSession, CollectionError,
    DeviceDataCollector, GatewayClient, PresentationMode, WalletError, WalletSheet,
    WalletTokenSource,
};
use crate::domain::status::StatusSnapshot;
use crate::domain::token::{
    AuthenticationSetup, TokenDescriptor, TokenizeRequest, WalletCredential,
};
use crate::error::GatewayError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

/// A scripted reply: either a response body or a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scripted<T> {
    Failure { network_error: String },
    Body(T),
}

impl<T> Scripted<T> {
    fn into_result(self) -> Result<T, GatewayError> {
        match self {
            Scripted::Failure { network_error } => Err(GatewayError::Network(network_error)),
            Scripted::Body(body) => Ok(body),
        }
    }
}

/// Replies a [`ScriptedGateway`] hands out, in order, per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayScript {
    pub tokenize: Vec<Scripted<TokenizeResponseBody>>,
    pub initialize: Vec<Scripted<InitializeResponseBody>>,
    /// Once exhausted, the last poll reply repeats.
    pub poll: Vec<Scripted<StatusResponseBody>>,
}

/// A call the gateway received, recorded in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Tokenize(TokenizeRequest),
    Initialize(InitializeRequest),
    PollStatus {
        payment_key: String,
        method_id: String,
    },
}

#[derive(Default)]
struct ScriptState {
    tokenize: VecDeque<Scripted<TokenizeResponseBody>>,
    initialize: VecDeque<Scripted<InitializeResponseBody>>,
    poll: VecDeque<Scripted<StatusResponseBody>>,
    last_poll: Option<Scripted<StatusResponseBody>>,
    calls: Vec<GatewayCall>,
}

/// A simulated gateway that replays a [`GatewayScript`].
///
/// Uses `Arc<RwLock<..>>` so clones share the same script and call log.
/// Backs the demo binary and the test suites.
#[derive(Default, Clone)]
pub struct ScriptedGateway {
    state: Arc<RwLock<ScriptState>>,
}

impl ScriptedGateway {
    pub fn new(script: GatewayScript) -> Self {
        Self {
            state: Arc::new(RwLock::new(ScriptState {
                tokenize: script.tokenize.into(),
                initialize: script.initialize.into(),
                poll: script.poll.into(),
                ..ScriptState::default()
            })),
        }
    }

    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn poll_count(&self) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|call| matches!(call, GatewayCall::PollStatus { .. }))
            .count()
    }
}

#[async_trait]
impl GatewayClient for ScriptedGateway {
    async fn tokenize(&self, request: TokenizeRequest) -> Result<TokenDescriptor, GatewayError> {
        let mut state = self.state.write().await;
        state.calls.push(GatewayCall::Tokenize(request));
        state
            .tokenize
            .pop_front()
            .ok_or_else(|| GatewayError::Network("no scripted tokenize reply".to_string()))?
            .into_result()?
            .into_descriptor()
    }

    async fn initialize(&self, request: InitializeRequest) -> Result<Initialization, GatewayError> {
        let mut state = self.state.write().await;
        state.calls.push(GatewayCall::Initialize(request));
        state
            .initialize
            .pop_front()
            .ok_or_else(|| GatewayError::Network("no scripted initialize reply".to_string()))?
            .into_result()?
            .into_initialization()
    }

    async fn poll_status(
        &self,
        payment_key: &str,
        method_id: &str,
    ) -> Result<StatusSnapshot, GatewayError> {
        let mut state = self.state.write().await;
        state.calls.push(GatewayCall::PollStatus {
            payment_key: payment_key.to_string(),
            method_id: method_id.to_string(),
        });
        let reply = match state.poll.pop_front() {
            Some(reply) => {
                state.last_poll = Some(reply.clone());
                reply
            }
            None => state
                .last_poll
                .clone()
                .ok_or_else(|| GatewayError::Network("no scripted poll reply".to_string()))?,
        };
        Ok(reply.into_result()?.into_snapshot())
    }
}

/// What a scripted browser session does when opened.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserStep {
    /// Ends on the callback deep link with these query parameters.
    Complete {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        transaction_id: Option<String>,
    },
    /// Ends on an explicit URL.
    Redirect { url: Url },
    Cancel,
    Dismiss {
        #[serde(default)]
        last_url: Option<Url>,
    },
    LaunchFailure { message: String },
    /// Never returns; only a routed deep link can finish the challenge.
    Hang,
}

impl From<Result<BrowserResult, BrowserError>> for BrowserStep {
    fn from(result: Result<BrowserResult, BrowserError>) -> Self {
        match result {
            Ok(BrowserResult::Success { url }) => BrowserStep::Redirect { url },
            Ok(BrowserResult::Cancel) => BrowserStep::Cancel,
            Ok(BrowserResult::Dismiss { last_url }) => BrowserStep::Dismiss { last_url },
            Err(BrowserError(message)) => BrowserStep::LaunchFailure { message },
        }
    }
}

/// A browser session that plays back [`BrowserStep`]s, one per `open`.
#[derive(Default)]
pub struct ScriptedBrowser {
    steps: Mutex<VecDeque<BrowserStep>>,
    launches: Mutex<Vec<(BrowserLaunch, PresentationMode)>>,
}

impl ScriptedBrowser {
    pub fn new(results: Vec<Result<BrowserResult, BrowserError>>) -> Self {
        Self::from_steps(results.into_iter().map(BrowserStep::from).collect())
    }

    pub fn from_steps(steps: Vec<BrowserStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            launches: Mutex::default(),
        }
    }

    pub fn hanging() -> Self {
        Self::from_steps(vec![BrowserStep::Hang])
    }

    pub fn launches(&self) -> Vec<(BrowserLaunch, PresentationMode)> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl BrowserSession for ScriptedBrowser {
    async fn open(
        &self,
        launch: &BrowserLaunch,
        mode: PresentationMode,
    ) -> Result<BrowserResult, BrowserError> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((launch.clone(), mode));
        let step = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match step {
            None => Err(BrowserError("no scripted browser step".to_string())),
            Some(BrowserStep::Complete {
                status,
                transaction_id,
            }) => {
                let mut url = launch.callback_url.clone();
                {
                    let mut query = url.query_pairs_mut();
                    if let Some(transaction_id) = &transaction_id {
                        query.append_pair("transactionId", transaction_id);
                    }
                    if let Some(status) = &status {
                        query.append_pair("status", status);
                    }
                }
                Ok(BrowserResult::Success { url })
            }
            Some(BrowserStep::Redirect { url }) => Ok(BrowserResult::Success { url }),
            Some(BrowserStep::Cancel) => Ok(BrowserResult::Cancel),
            Some(BrowserStep::Dismiss { last_url }) => Ok(BrowserResult::Dismiss { last_url }),
            Some(BrowserStep::LaunchFailure { message }) => Err(BrowserError(message)),
            Some(BrowserStep::Hang) => std::future::pending().await,
        }
    }
}

/// Scenario description of a device-data collector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollectorScript {
    pub delay_ms: u64,
    pub fail: Option<String>,
    pub sessions: Vec<SessionDescriptor>,
}

/// A device-data collector with a fixed delay and a fixed answer.
pub struct ScriptedCollector {
    delay: Duration,
    outcome: Result<Vec<SessionDescriptor>, String>,
    calls: AtomicUsize,
}

impl ScriptedCollector {
    pub fn succeeding(sessions: Vec<SessionDescriptor>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(sessions),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl From<CollectorScript> for ScriptedCollector {
    fn from(script: CollectorScript) -> Self {
        let collector = match script.fail {
            Some(message) => Self::failing(&message),
            None => Self::succeeding(script.sessions),
        };
        collector.with_delay(Duration::from_millis(script.delay_ms))
    }
}

#[async_trait]
impl DeviceDataCollector for ScriptedCollector {
    async fn collect(
        &self,
        _setup: &AuthenticationSetup,
    ) -> Result<Vec<SessionDescriptor>, CollectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone().map_err(CollectionError)
    }
}

/// Stand-in for a native wallet sheet.
///
/// Produces a deterministic base64 payload describing the sheet it was shown,
/// so flows that need a wallet token can run without a device.
#[derive(Debug, Clone, Default)]
pub struct SimulatedWalletTokenSource {
    fail_with: Option<WalletError>,
}

impl SimulatedWalletTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: WalletError) -> Self {
        Self {
            fail_with: Some(error),
        }
    }
}

#[async_trait]
impl WalletTokenSource for SimulatedWalletTokenSource {
    async fn request_token(&self, sheet: &WalletSheet) -> Result<WalletCredential, WalletError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        let payload = serde_json::json!({
            "simulated": true,
            "amount": sheet.amount.value().to_string(),
            "currency": sheet.currency.as_str(),
            "country": sheet.country.as_str(),
        });
        Ok(WalletCredential {
            provider: sheet.provider,
            payload: STANDARD.encode(payload.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Amount, Country, Currency};
    use crate::domain::token::WalletProvider;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_scripted_gateway_replays_in_order() {
        let gateway = ScriptedGateway::new(GatewayScript {
            tokenize: vec![
                Scripted::Failure {
                    network_error: "offline".to_string(),
                },
                Scripted::Body(TokenizeResponseBody::success("T1")),
            ],
            ..GatewayScript::default()
        });
        let request = TokenizeRequest::Wallet {
            wallet: WalletCredential {
                provider: WalletProvider::GooglePay,
                payload: "x".to_string(),
            },
            session_id: "s".to_string(),
        };

        assert_eq!(
            gateway.tokenize(request.clone()).await,
            Err(GatewayError::Network("offline".to_string()))
        );
        assert_eq!(gateway.tokenize(request.clone()).await.unwrap().token, "T1");
        assert!(gateway.tokenize(request).await.is_err());
        assert_eq!(gateway.calls().await.len(), 3);
    }

    #[tokio::test]
    async fn test_last_poll_reply_repeats() {
        let gateway = ScriptedGateway::new(GatewayScript {
            poll: vec![Scripted::Body(StatusResponseBody::new(false, "0", true))],
            ..GatewayScript::default()
        });
        for _ in 0..3 {
            let snapshot = gateway.poll_status("pk", "m").await.unwrap();
            assert!(snapshot.should_continue());
        }
        assert_eq!(gateway.poll_count().await, 3);
    }

    #[tokio::test]
    async fn test_script_from_json() {
        let json = r#"{
            "tokenize": [{"code": 1, "token": "T1"}],
            "poll": [{"network_error": "reset"}, {"confirmed": true, "statusCode": "2", "allowRetry": false}]
        }"#;
        let script: GatewayScript = serde_json::from_str(json).unwrap();
        assert_eq!(script.tokenize.len(), 1);
        assert!(matches!(script.poll[0], Scripted::Failure { .. }));
        assert!(matches!(script.poll[1], Scripted::Body(_)));
    }

    #[tokio::test]
    async fn test_browser_complete_builds_callback() {
        let browser = ScriptedBrowser::from_steps(vec![BrowserStep::Complete {
            status: Some("Y".to_string()),
            transaction_id: Some("tx-1".to_string()),
        }]);
        let launch = BrowserLaunch {
            url: Url::parse("https://acs.example").unwrap(),
            callback_url: Url::parse("app-scheme://3ds-complete").unwrap(),
        };
        let result = browser
            .open(&launch, PresentationMode::AuthSession)
            .await
            .unwrap();
        assert_eq!(
            result,
            BrowserResult::Success {
                url: Url::parse("app-scheme://3ds-complete?transactionId=tx-1&status=Y").unwrap()
            }
        );
        assert!(browser.open(&launch, PresentationMode::AuthSession).await.is_err());
    }

    #[tokio::test]
    async fn test_simulated_wallet() {
        let sheet = WalletSheet {
            provider: WalletProvider::ApplePay,
            amount: Amount::new(dec!(10.00)).unwrap(),
            currency: Currency::new("BRL").unwrap(),
            country: Country::new("BR").unwrap(),
        };
        let credential = SimulatedWalletTokenSource::new()
            .request_token(&sheet)
            .await
            .unwrap();
        assert_eq!(credential.provider, WalletProvider::ApplePay);
        let decoded = STANDARD.decode(credential.payload).unwrap();
        assert!(String::from_utf8(decoded).unwrap().contains("\"simulated\":true"));

        let failing = SimulatedWalletTokenSource::failing(WalletError::Cancelled);
        assert_eq!(
            failing.request_token(&sheet).await,
            Err(WalletError::Cancelled)
        );
    }
}
