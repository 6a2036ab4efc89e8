use crate::config::OrchestratorConfig;
use crate::domain::ports::{
    BrowserSessionRef, DeviceDataCollectorRef, WalletError, WalletTokenSourceRef,
};
use crate::domain::request::PaymentRequest;
use crate::error::Result;
use crate::infrastructure::scripted::{
    BrowserStep, CollectorScript, GatewayScript, ScriptedBrowser, ScriptedCollector,
    ScriptedGateway, SimulatedWalletTokenSource,
};
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;

/// How the simulated wallet sheet answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletScript {
    #[default]
    Approve,
    Cancel,
    Unavailable(String),
}

/// A payment request plus the scripted behaviour of every collaborator it
/// will meet. The demo binary runs one scenario per invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    pub request: PaymentRequest,
    #[serde(default)]
    pub config: Option<OrchestratorConfig>,
    #[serde(default)]
    pub gateway: GatewayScript,
    #[serde(default)]
    pub browser: Vec<BrowserStep>,
    #[serde(default)]
    pub collector: Option<CollectorScript>,
    #[serde(default)]
    pub wallet: Option<WalletScript>,
}

impl Scenario {
    pub fn scripted_gateway(&self) -> ScriptedGateway {
        ScriptedGateway::new(self.gateway.clone())
    }

    pub fn browser(&self) -> BrowserSessionRef {
        Arc::new(ScriptedBrowser::from_steps(self.browser.clone()))
    }

    pub fn collector(&self) -> Option<DeviceDataCollectorRef> {
        self.collector
            .clone()
            .map(|script| Arc::new(ScriptedCollector::from(script)) as DeviceDataCollectorRef)
    }

    pub fn wallet(&self) -> Option<WalletTokenSourceRef> {
        let source = match self.wallet.clone()? {
            WalletScript::Approve => SimulatedWalletTokenSource::new(),
            WalletScript::Cancel => SimulatedWalletTokenSource::failing(WalletError::Cancelled),
            WalletScript::Unavailable(reason) => {
                SimulatedWalletTokenSource::failing(WalletError::Unavailable(reason))
            }
        };
        Some(Arc::new(source))
    }
}

/// Reads a [`Scenario`] document from any `Read` source (file, stdin).
pub struct ScenarioReader<R: Read> {
    source: R,
}

impl<R: Read> ScenarioReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn read(self) -> Result<Scenario> {
        let scenario: Scenario = serde_json::from_reader(self.source)?;
        if let Some(config) = &scenario.config {
            config.validate()?;
        }
        Ok(scenario)
    }
}
