use super::challenge::ChallengeExecutor;
use super::data_collection::{CollectionReport, DataCollectionStep};
use super::poller::{PollOutcome, StatusPoller};
use crate::config::OrchestratorConfig;
use crate::domain::attempt::{AttemptState, PaymentAttempt, PaymentMethodKind};
use crate::domain::challenge::ChallengeOutcome;
use crate::domain::gateway::{InitializeRequest, Initialization, MethodLineItem};
use crate::domain::outcome::{
    AttemptEvent, FailureKind, PaymentOutcome, PaymentResult, ProgressFn, silent,
};
use crate::domain::ports::{
    BrowserSessionRef, DeviceDataCollectorRef, GatewayClientRef, SleeperRef, WalletSheet,
    WalletTokenSourceRef,
};
use crate::domain::request::{PaymentLine, PaymentRequest};
use crate::domain::token::{
    AuthenticationSetup, Credential, TokenizeRequest, WalletCredential, WalletProvider,
};
use crate::error::Result;
use crate::infrastructure::clock::TokioSleeper;
use crate::interfaces::deep_link::DeepLinkRouter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, info, instrument};

/// Early exit from the attempt with its terminal outcome.
type Step<T> = std::result::Result<T, PaymentOutcome>;

/// Runs one payment attempt from raw credentials to a terminal result.
///
/// An orchestrator is built per attempt and consumed by [`execute`](Self::execute).
/// The collaborators it holds are shared handles, so the host can reuse them
/// across attempts.
pub struct PaymentOrchestrator {
    config: Arc<OrchestratorConfig>,
    gateway: GatewayClientRef,
    wallet: Option<WalletTokenSourceRef>,
    data_collection: DataCollectionStep,
    challenge: ChallengeExecutor,
    poller: StatusPoller,
    progress: ProgressFn,
    cancel: CancellationToken,
}

pub struct PaymentOrchestratorBuilder {
    config: Arc<OrchestratorConfig>,
    gateway: GatewayClientRef,
    browser: BrowserSessionRef,
    collector: Option<DeviceDataCollectorRef>,
    wallet: Option<WalletTokenSourceRef>,
    sleeper: Option<SleeperRef>,
    progress: ProgressFn,
    cancel: CancellationToken,
}

impl PaymentOrchestratorBuilder {
    pub fn collector(mut self, collector: DeviceDataCollectorRef) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn wallet(mut self, wallet: WalletTokenSourceRef) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn sleeper(mut self, sleeper: SleeperRef) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn progress(mut self, progress: ProgressFn) -> Self {
        self.progress = progress;
        self
    }

    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> PaymentOrchestrator {
        let sleeper = self
            .sleeper
            .unwrap_or_else(|| Arc::new(TokioSleeper) as SleeperRef);
        PaymentOrchestrator {
            data_collection: DataCollectionStep::new(
                self.collector,
                self.config.collection_timeout(),
            ),
            challenge: ChallengeExecutor::new(self.browser, self.config.challenge.clone()),
            poller: StatusPoller::new(self.gateway.clone(), sleeper, self.config.poll.clone()),
            gateway: self.gateway,
            wallet: self.wallet,
            progress: self.progress,
            cancel: self.cancel,
            config: self.config,
        }
    }
}

impl PaymentOrchestrator {
    pub fn builder(
        config: Arc<OrchestratorConfig>,
        gateway: GatewayClientRef,
        browser: BrowserSessionRef,
    ) -> PaymentOrchestratorBuilder {
        PaymentOrchestratorBuilder {
            config,
            gateway,
            browser,
            collector: None,
            wallet: None,
            sleeper: None,
            progress: silent(),
            cancel: CancellationToken::new(),
        }
    }

    /// Handle for the host's deep-link handler while a challenge is pending.
    pub fn deep_link_router(&self) -> DeepLinkRouter {
        self.challenge.router()
    }

    /// Runs the attempt to completion.
    ///
    /// Only an unusable request is an `Err`; every expected ending, including
    /// gateway rejections, cancellation and timeouts, is an `Ok(PaymentResult)`.
    #[instrument(skip_all, fields(partner_unique_id = tracing::field::Empty))]
    pub async fn execute(self, request: PaymentRequest) -> Result<PaymentResult> {
        let mut attempt = PaymentAttempt::from_request(&request)?;
        Span::current().record(
            "partner_unique_id",
            attempt.ids.partner_unique_id.as_str(),
        );
        info!(
            amount = %attempt.amount,
            currency = attempt.currency.as_str(),
            method = ?attempt.method,
            "payment attempt started"
        );

        let outcome = match self.drive(&request, &mut attempt).await {
            Ok(outcome) | Err(outcome) => outcome,
        };
        self.enter(&mut attempt, outcome.terminal_state());
        info!(?outcome, "payment attempt finished");

        Ok(PaymentResult { outcome, attempt })
    }

    async fn drive(
        &self,
        request: &PaymentRequest,
        attempt: &mut PaymentAttempt,
    ) -> Step<PaymentOutcome> {
        let (tokens, tokenization_setup) = self.tokenize(request, attempt).await?;
        let reference = tokenization_setup
            .as_ref()
            .map(|setup| setup.reference_id.clone());
        let initialization = self.initialize(request, attempt, tokens, reference).await?;

        let setup = initialization
            .authentication_setup
            .clone()
            .or(tokenization_setup);
        if let Some(setup) = setup {
            self.collect_device_data(attempt, &setup).await;
        }

        if let Some(descriptor) = &initialization.challenge {
            if self.step_up_enabled(request) {
                self.enter(attempt, AttemptState::Challenging);
                match self.challenge.execute(descriptor).await {
                    ChallengeOutcome::Succeeded(completion) => {
                        debug!(?completion, "challenge completed");
                    }
                    ChallengeOutcome::Cancelled => {
                        return Err(PaymentOutcome::failed(
                            FailureKind::ChallengeCancelled,
                            "Authentication challenge cancelled by the customer",
                        ));
                    }
                    ChallengeOutcome::Failed(cause) => {
                        return Err(PaymentOutcome::failed(FailureKind::ChallengeFailed, cause));
                    }
                }
            } else {
                info!("challenge available but step-up disabled, bypassing");
                attempt.challenge_bypassed = true;
                (self.progress)(AttemptEvent::ChallengeBypassed);
            }
        }

        self.enter(attempt, AttemptState::Polling);
        let progress = self.progress.clone();
        let on_update = move |update| progress(AttemptEvent::Poll { update });
        let polled = self
            .poller
            .poll(
                &initialization.payment_key,
                &initialization.method_id,
                &on_update,
                &self.cancel,
            )
            .await;

        Ok(match polled {
            PollOutcome::Approved { status_code } => PaymentOutcome::Approved { status_code },
            PollOutcome::Declined { status_code } => PaymentOutcome::Declined { status_code },
            PollOutcome::TimedOut { polls } => PaymentOutcome::TimedOut { polls },
            PollOutcome::Abandoned { polls } => PaymentOutcome::failed(
                FailureKind::Abandoned,
                format!("Attempt abandoned by caller after {polls} status polls"),
            ),
        })
    }

    /// Tokenizes every line that needs it, one at a time. Returns one token slot
    /// per line plus the first complete authentication setup seen.
    async fn tokenize(
        &self,
        request: &PaymentRequest,
        attempt: &mut PaymentAttempt,
    ) -> Step<(Vec<Option<String>>, Option<AuthenticationSetup>)> {
        let needs_tokenization = request
            .lines
            .iter()
            .any(|line| line.credential.needs_tokenization());
        if needs_tokenization {
            self.enter(attempt, AttemptState::Tokenizing);
        }

        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| attempt.ids.partner_unique_id.clone());
        let mut tokens = Vec::with_capacity(request.lines.len());
        let mut setup = None;

        for line in &request.lines {
            let tokenize_request = match &line.credential {
                Credential::Card(card) => TokenizeRequest::Card {
                    card: card.clone(),
                    session_id: session_id.clone(),
                },
                Credential::Wallet { provider } => TokenizeRequest::Wallet {
                    wallet: self.wallet_credential(*provider, line, attempt).await?,
                    session_id: session_id.clone(),
                },
                Credential::SavedToken { token } => {
                    tokens.push(Some(token.clone()));
                    continue;
                }
                Credential::BankTransfer => {
                    tokens.push(None);
                    continue;
                }
            };

            let descriptor = self.gateway.tokenize(tokenize_request).await.map_err(|err| {
                info!(error = %err, "tokenization failed");
                PaymentOutcome::failed(FailureKind::TokenizationFailed, err.caller_message())
            })?;
            debug!(brand = ?descriptor.brand, "line tokenized");
            if setup.is_none() {
                setup = descriptor.authentication_setup;
            }
            tokens.push(Some(descriptor.token));
        }

        if needs_tokenization {
            self.enter(attempt, AttemptState::Tokenized);
        }
        Ok((tokens, setup))
    }

    async fn wallet_credential(
        &self,
        provider: WalletProvider,
        line: &PaymentLine,
        attempt: &PaymentAttempt,
    ) -> Step<WalletCredential> {
        let wallet = self.wallet.as_ref().ok_or_else(|| {
            PaymentOutcome::failed(
                FailureKind::TokenizationFailed,
                "No wallet token source configured",
            )
        })?;
        let sheet = WalletSheet {
            provider,
            amount: line.amount,
            currency: attempt.currency.clone(),
            country: attempt.country.clone(),
        };
        wallet.request_token(&sheet).await.map_err(|err| {
            info!(error = %err, "wallet sheet did not produce a token");
            PaymentOutcome::failed(FailureKind::TokenizationFailed, err.to_string())
        })
    }

    async fn initialize(
        &self,
        request: &PaymentRequest,
        attempt: &mut PaymentAttempt,
        tokens: Vec<Option<String>>,
        authentication_reference: Option<String>,
    ) -> Step<Initialization> {
        self.enter(attempt, AttemptState::Initiating);

        let payment_methods = request
            .lines
            .iter()
            .zip(tokens)
            .map(|(line, token)| MethodLineItem {
                method: PaymentMethodKind::from(&line.credential),
                amount: line.amount,
                token,
                installments: line.installments,
                save: line.save,
            })
            .collect();
        let init_request = InitializeRequest {
            partner_unique_id: attempt.ids.partner_unique_id.clone(),
            currency: attempt.currency.clone(),
            country: attempt.country.clone(),
            amount: attempt.amount,
            payment_methods,
            customer: attempt.customer.clone(),
            authentication_reference,
        };

        let initialization = self.gateway.initialize(init_request).await.map_err(|err| {
            info!(error = %err, "initialization failed");
            PaymentOutcome::failed(FailureKind::InitializationFailed, err.caller_message())
        })?;

        attempt.ids.payment_key = Some(initialization.payment_key.clone());
        attempt.ids.method_id = Some(initialization.method_id.clone());
        self.enter(attempt, AttemptState::Initiated);

        if let Some(instructions) = &initialization.bank_transfer {
            attempt.bank_transfer = Some(instructions.clone());
            (self.progress)(AttemptEvent::BankTransferReady {
                instructions: instructions.clone(),
            });
        }
        Ok(initialization)
    }

    async fn collect_device_data(&self, attempt: &mut PaymentAttempt, setup: &AuthenticationSetup) {
        self.enter(attempt, AttemptState::CollectingData);
        if let CollectionReport::Collected(sessions) = self.data_collection.run(setup).await {
            attempt.device_sessions = sessions;
        }
    }

    fn step_up_enabled(&self, request: &PaymentRequest) -> bool {
        request.step_up.unwrap_or(self.config.step_up_enabled)
    }

    fn enter(&self, attempt: &mut PaymentAttempt, state: AttemptState) {
        let advanced = attempt.advance(state);
        debug_assert!(advanced.is_ok(), "attempt state machine violated: {advanced:?}");
        match advanced {
            Ok(()) => {
                debug!(?state, "attempt state changed");
                (self.progress)(AttemptEvent::StateChanged { state });
            }
            Err(err) => error!(error = %err, "attempt state machine violated"),
        }
    }
}
