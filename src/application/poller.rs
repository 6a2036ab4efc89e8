use crate::config::PollConfig;
use crate::domain::outcome::PollUpdate;
use crate::domain::ports::{GatewayClientRef, SleeperRef};
use crate::domain::status::{Settlement, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// How a poll run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Approved { status_code: StatusCode },
    Declined { status_code: StatusCode },
    TimedOut { polls: u32 },
    /// The cancellation token fired before a terminal answer.
    Abandoned { polls: u32 },
}

/// Server-guided settlement poll.
///
/// Keeps asking while the gateway says `confirmed=false, allowRetry=true`,
/// up to `max_attempts` calls. Transport errors are reported and retried
/// after `error_backoff`; they never end the run on their own.
pub struct StatusPoller {
    gateway: GatewayClientRef,
    sleeper: SleeperRef,
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(gateway: GatewayClientRef, sleeper: SleeperRef, config: PollConfig) -> Self {
        Self {
            gateway,
            sleeper,
            config,
        }
    }

    #[instrument(skip(self, on_update, cancel))]
    pub async fn poll(
        &self,
        payment_key: &str,
        method_id: &str,
        on_update: &(dyn Fn(PollUpdate) + Send + Sync),
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let ceiling = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                debug!(polls = attempt, "poll abandoned by caller");
                return PollOutcome::Abandoned { polls: attempt };
            }
            attempt += 1;
            let last = attempt >= ceiling;

            let pause = match self.gateway.poll_status(payment_key, method_id).await {
                Ok(snapshot) => {
                    let status_code = snapshot.status_code.clone();
                    match snapshot.classify() {
                        Settlement::Approved => {
                            on_update(PollUpdate::Approved {
                                attempt,
                                status_code: status_code.clone(),
                            });
                            return PollOutcome::Approved { status_code };
                        }
                        Settlement::Declined => {
                            on_update(PollUpdate::Declined {
                                attempt,
                                status_code: status_code.clone(),
                            });
                            return PollOutcome::Declined { status_code };
                        }
                        Settlement::Pending if last => {
                            on_update(PollUpdate::TimedOut { attempt });
                            return PollOutcome::TimedOut { polls: attempt };
                        }
                        Settlement::Pending if !snapshot.allow_retry => {
                            // Server gave up before confirming.
                            on_update(PollUpdate::Declined {
                                attempt,
                                status_code: status_code.clone(),
                            });
                            return PollOutcome::Declined { status_code };
                        }
                        Settlement::Pending => {
                            debug!(attempt, %status_code, "settlement pending");
                            on_update(PollUpdate::Pending {
                                attempt,
                                status_code,
                            });
                            self.config.interval()
                        }
                    }
                }
                Err(err) => {
                    warn!(attempt, error = %err, "status poll failed");
                    on_update(PollUpdate::Error {
                        attempt,
                        message: err.to_string(),
                    });
                    if last {
                        on_update(PollUpdate::TimedOut { attempt });
                        return PollOutcome::TimedOut { polls: attempt };
                    }
                    self.config.error_backoff()
                }
            };

            if !self.pause(pause, cancel).await {
                return PollOutcome::Abandoned { polls: attempt };
            }
        }
    }

    /// Waits before the next call. `false` when cancelled meanwhile.
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        if duration.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = self.sleeper.sleep(duration) => true,
        }
    }
}
