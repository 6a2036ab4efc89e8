use super::attempt::SessionDescriptor;
use super::gateway::{InitializeRequest, Initialization};
use super::money::{Amount, Country, Currency};
use super::status::StatusSnapshot;
use super::token::{
    AuthenticationSetup, TokenDescriptor, TokenizeRequest, WalletCredential, WalletProvider,
};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// The three remote calls the orchestrator needs. Implementations never retry.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn tokenize(&self, request: TokenizeRequest) -> Result<TokenDescriptor, GatewayError>;
    async fn initialize(&self, request: InitializeRequest) -> Result<Initialization, GatewayError>;
    async fn poll_status(
        &self,
        payment_key: &str,
        method_id: &str,
    ) -> Result<StatusSnapshot, GatewayError>;
}

/// How the host presents the challenge page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationMode {
    /// A platform authentication session (ASWebAuthenticationSession, Custom Tabs auth).
    AuthSession,
    /// A plain in-app browser, used when the auth session cannot be launched.
    InAppBrowser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserLaunch {
    pub url: Url,
    /// The deep link that closes the session when the ACS redirects to it.
    pub callback_url: Url,
}

/// What the platform reported when the browser session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserResult {
    /// The session ended on the callback deep link.
    Success { url: Url },
    /// The user explicitly cancelled.
    Cancel,
    /// The session went away without a clear reason.
    Dismiss { last_url: Option<Url> },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("browser session failed: {0}")]
pub struct BrowserError(pub String);

/// Browser capability supplied by the host application.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn open(
        &self,
        launch: &BrowserLaunch,
        mode: PresentationMode,
    ) -> Result<BrowserResult, BrowserError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("device data collection failed: {0}")]
pub struct CollectionError(pub String);

/// Device-fingerprinting provider. Best effort only.
#[async_trait]
pub trait DeviceDataCollector: Send + Sync {
    async fn collect(
        &self,
        setup: &AuthenticationSetup,
    ) -> Result<Vec<SessionDescriptor>, CollectionError>;
}

/// What a wallet sheet is asked to authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSheet {
    pub provider: WalletProvider,
    pub amount: Amount,
    pub currency: Currency,
    pub country: Country,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet sheet cancelled by user")]
    Cancelled,
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// Native wallet sheet (Apple Pay, Google Pay) or a simulated stand-in.
#[async_trait]
pub trait WalletTokenSource: Send + Sync {
    async fn request_token(&self, sheet: &WalletSheet) -> Result<WalletCredential, WalletError>;
}

/// Injected so polling can be driven without real timers.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub type GatewayClientRef = Arc<dyn GatewayClient>;
pub type BrowserSessionRef = Arc<dyn BrowserSession>;
pub type DeviceDataCollectorRef = Arc<dyn DeviceDataCollector>;
pub type WalletTokenSourceRef = Arc<dyn WalletTokenSource>;
pub type SleeperRef = Arc<dyn Sleeper>;
