use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CALLBACK_URL: &str = "app-scheme://3ds-complete";

/// Immutable settings for the orchestrator and its collaborators.
///
/// Built once by the host and shared by `Arc` across attempts; nothing in the
/// crate mutates it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OrchestratorConfig {
    /// Upper bound on device-data collection.
    pub collection_timeout_ms: u64,
    /// Default step-up policy; a request may override it.
    pub step_up_enabled: bool,
    pub poll: PollConfig,
    pub challenge: ChallengeConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            collection_timeout_ms: 3_000,
            step_up_enabled: true,
            poll: PollConfig::default(),
            challenge: ChallengeConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads a JSON config file. Missing keys keep their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll.max_attempts == 0 {
            return Err(PaymentError::ConfigError(
                "poll.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_millis(self.collection_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PollConfig {
    /// Attempt ceiling for the status poll.
    pub max_attempts: u32,
    /// Delay between ordinary polls. Zero: the server paces us.
    pub interval_ms: u64,
    /// Delay before the next poll after a transport error.
    pub error_backoff_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval_ms: 0,
            error_backoff_ms: 1_000,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ChallengeConfig {
    /// Deep link the host routes back into the challenge executor.
    pub callback_url: Url,
    /// Our own landing page, reached only after the ACS step completed.
    pub landing_url: Option<Url>,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            callback_url: Url::parse(DEFAULT_CALLBACK_URL)
                .unwrap_or_else(|_| unreachable!("default callback URL is valid")),
            landing_url: None,
        }
    }
}

impl ChallengeConfig {
    /// The page whose dismissal counts as a completed challenge.
    pub fn landing_page(&self) -> &Url {
        self.landing_url.as_ref().unwrap_or(&self.callback_url)
    }
}
