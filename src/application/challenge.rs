use crate::config::ChallengeConfig;
use crate::domain::challenge::{
    ChallengeCompletion, ChallengeDescriptor, ChallengeOutcome, CompletionSignal, ProtocolVersion,
};
use crate::domain::ports::{
    BrowserError, BrowserLaunch, BrowserResult, BrowserSessionRef, PresentationMode,
};
use crate::interfaces::deep_link::{DeepLinkCallback, DeepLinkRouter, PendingCallback, same_target};
use crate::interfaces::redirect;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Query keys that mark a challenge URL as already carrying its request.
const INLINE_REQUEST_KEYS: [&str; 2] = ["creq", "pareq"];

/// Drives one step-up authentication through a host-owned browser session.
///
/// The executor suspends until the browser session ends or the host routes
/// the callback deep link through [`DeepLinkRouter`], whichever comes first.
pub struct ChallengeExecutor {
    browser: BrowserSessionRef,
    config: ChallengeConfig,
    pending: PendingCallback,
}

impl ChallengeExecutor {
    pub fn new(browser: BrowserSessionRef, config: ChallengeConfig) -> Self {
        Self {
            browser,
            config,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn router(&self) -> DeepLinkRouter {
        DeepLinkRouter::new(self.config.callback_url.clone(), self.pending.clone())
    }

    #[instrument(skip_all, fields(acs = %descriptor.url))]
    pub async fn execute(&self, descriptor: &ChallengeDescriptor) -> ChallengeOutcome {
        let version = descriptor.protocol_version();
        let launch = match self.launch_for(descriptor, version) {
            Ok(launch) => launch,
            Err(cause) => return ChallengeOutcome::Failed(cause),
        };
        let Some(callback) = self.arm() else {
            return ChallengeOutcome::Failed("another challenge is already pending".to_string());
        };
        info!(?version, "presenting challenge");

        let outcome = tokio::select! {
            Ok(url) = callback => {
                debug!(%url, "challenge callback routed by host");
                self.classify_callback(&url, descriptor, CompletionSignal::Callback)
            }
            result = self.open_with_fallback(&launch) => match result {
                Ok(result) => self.classify_browser(result, descriptor),
                Err(err) => ChallengeOutcome::Failed(err.to_string()),
            },
        };
        self.disarm();
        outcome
    }

    /// Builds what the browser opens: the ACS URL itself when it already carries
    /// the request, otherwise a local document that auto-posts it.
    pub fn launch_for(
        &self,
        descriptor: &ChallengeDescriptor,
        version: ProtocolVersion,
    ) -> Result<BrowserLaunch, String> {
        let url = if carries_inline_request(&descriptor.url) {
            descriptor.url.clone()
        } else {
            let fields = self.form_fields(descriptor, version);
            let document = redirect::auto_submit_document(&descriptor.url, &fields);
            redirect::data_url(&document).map_err(|e| format!("cannot build redirect page: {e}"))?
        };
        Ok(BrowserLaunch {
            url,
            callback_url: self.config.callback_url.clone(),
        })
    }

    /// Form-POST parameters; the names depend on the protocol version.
    pub fn form_fields(
        &self,
        descriptor: &ChallengeDescriptor,
        version: ProtocolVersion,
    ) -> Vec<(&'static str, String)> {
        match version {
            ProtocolVersion::V1 => {
                let term_url = descriptor
                    .term_url
                    .as_ref()
                    .unwrap_or(self.config.landing_page());
                vec![
                    ("PaReq", descriptor.payload.clone()),
                    ("TermUrl", term_url.to_string()),
                    ("MD", descriptor.correlation_id.clone().unwrap_or_default()),
                ]
            }
            ProtocolVersion::V2 => {
                let mut fields = vec![("creq", descriptor.payload.clone())];
                if let Some(session) = &descriptor.correlation_id {
                    fields.push(("threeDSSessionData", session.clone()));
                }
                fields
            }
        }
    }

    fn arm(&self) -> Option<oneshot::Receiver<Url>> {
        let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|sender| !sender.is_closed()) {
            return None;
        }
        let (sender, receiver) = oneshot::channel();
        *slot = Some(sender);
        Some(receiver)
    }

    fn disarm(&self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    async fn open_with_fallback(&self, launch: &BrowserLaunch) -> Result<BrowserResult, BrowserError> {
        match self.browser.open(launch, PresentationMode::AuthSession).await {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!(error = %err, "auth session failed to launch, retrying in-app browser");
                self.browser
                    .open(launch, PresentationMode::InAppBrowser)
                    .await
            }
        }
    }

    fn classify_browser(
        &self,
        result: BrowserResult,
        descriptor: &ChallengeDescriptor,
    ) -> ChallengeOutcome {
        match result {
            BrowserResult::Success { url } => {
                self.classify_callback(&url, descriptor, CompletionSignal::Callback)
            }
            BrowserResult::Cancel => {
                info!("challenge cancelled by user");
                ChallengeOutcome::Cancelled
            }
            BrowserResult::Dismiss { last_url } => match last_url {
                // The landing page is only reachable once the ACS step is done.
                Some(url)
                    if same_target(&url, self.config.landing_page())
                        || same_target(&url, &self.config.callback_url) =>
                {
                    info!(%url, "browser dismissed on landing page, treating as completed");
                    self.classify_callback(&url, descriptor, CompletionSignal::LandingPage)
                }
                other => {
                    info!(last_url = ?other, "browser dismissed before completion");
                    ChallengeOutcome::Cancelled
                }
            },
        }
    }

    fn classify_callback(
        &self,
        url: &Url,
        descriptor: &ChallengeDescriptor,
        signal: CompletionSignal,
    ) -> ChallengeOutcome {
        let callback = DeepLinkCallback::from_url(url);
        if let (Some(received), Some(expected)) =
            (&callback.transaction_id, &descriptor.correlation_id)
            && received != expected
        {
            warn!(%received, %expected, "challenge callback for a different transaction");
            return ChallengeOutcome::Failed(format!(
                "callback transaction {received} does not match {expected}"
            ));
        }
        ChallengeOutcome::Succeeded(ChallengeCompletion {
            transaction_id: callback.transaction_id,
            status: callback.status,
            signal,
        })
    }
}

fn carries_inline_request(url: &Url) -> bool {
    url.query_pairs().any(|(key, value)| {
        !value.is_empty()
            && INLINE_REQUEST_KEYS
                .iter()
                .any(|inline| key.eq_ignore_ascii_case(inline))
    })
}
