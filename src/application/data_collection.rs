use crate::domain::attempt::SessionDescriptor;
use crate::domain::ports::DeviceDataCollectorRef;
use crate::domain::token::AuthenticationSetup;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionReport {
    Collected(Vec<SessionDescriptor>),
    Failed(String),
    TimedOut,
    /// No provider was installed by the host.
    Unavailable,
}

/// Best-effort device fingerprinting, bounded by a fixed timeout.
///
/// Never fails: every problem is logged and folded into the report, and the
/// attempt carries on regardless.
pub struct DataCollectionStep {
    collector: Option<DeviceDataCollectorRef>,
    timeout: Duration,
}

impl DataCollectionStep {
    pub fn new(collector: Option<DeviceDataCollectorRef>, timeout: Duration) -> Self {
        Self { collector, timeout }
    }

    pub async fn run(&self, setup: &AuthenticationSetup) -> CollectionReport {
        let Some(collector) = &self.collector else {
            debug!("no device data collector installed, skipping");
            return CollectionReport::Unavailable;
        };

        match tokio::time::timeout(self.timeout, collector.collect(setup)).await {
            Ok(Ok(sessions)) => {
                info!(
                    reference_id = %setup.reference_id,
                    sessions = sessions.len(),
                    "device data collected"
                );
                CollectionReport::Collected(sessions)
            }
            Ok(Err(err)) => {
                warn!(reference_id = %setup.reference_id, error = %err, "device data collection failed, continuing");
                CollectionReport::Failed(err.0)
            }
            Err(_) => {
                warn!(
                    reference_id = %setup.reference_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "device data collection timed out, continuing"
                );
                CollectionReport::TimedOut
            }
        }
    }
}
