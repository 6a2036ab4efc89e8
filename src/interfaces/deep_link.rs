use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

/// Query parameters carried by `app-scheme://3ds-complete?transactionId=...&status=...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLinkCallback {
    pub transaction_id: Option<String>,
    pub status: Option<String>,
}

impl DeepLinkCallback {
    pub fn from_url(url: &Url) -> Self {
        let mut callback = Self::default();
        for (key, value) in url.query_pairs() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "transactionId" | "MD" | "threeDSSessionData" => {
                    callback.transaction_id.get_or_insert_with(|| value.to_string());
                }
                "status" | "transStatus" => {
                    callback.status.get_or_insert_with(|| value.to_string());
                }
                _ => {}
            }
        }
        callback
    }
}

/// Same scheme, host and path; query and fragment are ignored.
pub fn same_target(candidate: &Url, target: &Url) -> bool {
    candidate.scheme() == target.scheme()
        && candidate.host_str() == target.host_str()
        && candidate.path().trim_end_matches('/') == target.path().trim_end_matches('/')
}

pub(crate) type PendingCallback = Arc<Mutex<Option<oneshot::Sender<Url>>>>;

/// Handle the host uses to deliver deep links back into a pending challenge.
///
/// Cheap to clone; every clone feeds the same executor.
#[derive(Clone, Debug)]
pub struct DeepLinkRouter {
    callback_url: Url,
    pending: PendingCallback,
}

impl DeepLinkRouter {
    pub(crate) fn new(callback_url: Url, pending: PendingCallback) -> Self {
        Self {
            callback_url,
            pending,
        }
    }

    /// Whether a URI belongs to the challenge callback convention.
    pub fn accepts(&self, uri: &Url) -> bool {
        same_target(uri, &self.callback_url)
    }

    /// Routes a deep link. Returns `true` when a pending challenge took it.
    pub fn route(&self, uri: &str) -> bool {
        let Ok(url) = Url::parse(uri) else {
            warn!(uri, "ignoring unparseable deep link");
            return false;
        };
        if !self.accepts(&url) {
            debug!(%url, "deep link is not a challenge callback");
            return false;
        }
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(sender) => sender.send(url).is_ok(),
            None => {
                debug!(%url, "no challenge pending for deep link");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback() -> Url {
        Url::parse("app-scheme://3ds-complete").unwrap()
    }

    #[test]
    fn test_callback_query_parsing() {
        let url =
            Url::parse("app-scheme://3ds-complete?transactionId=tx-9&status=Y&extra=1").unwrap();
        let parsed = DeepLinkCallback::from_url(&url);
        assert_eq!(parsed.transaction_id.as_deref(), Some("tx-9"));
        assert_eq!(parsed.status.as_deref(), Some("Y"));

        let legacy = Url::parse("app-scheme://3ds-complete?MD=abc&transStatus=A").unwrap();
        let parsed = DeepLinkCallback::from_url(&legacy);
        assert_eq!(parsed.transaction_id.as_deref(), Some("abc"));
        assert_eq!(parsed.status.as_deref(), Some("A"));

        let empty = DeepLinkCallback::from_url(&callback());
        assert_eq!(empty, DeepLinkCallback::default());
    }

    #[test]
    fn test_same_target_ignores_query_and_trailing_slash() {
        let landing = Url::parse("https://shop.example/3ds/done").unwrap();
        assert!(same_target(
            &Url::parse("https://shop.example/3ds/done/?x=1").unwrap(),
            &landing
        ));
        assert!(!same_target(
            &Url::parse("https://acs.bank.example/3ds/done").unwrap(),
            &landing
        ));
        assert!(same_target(
            &Url::parse("app-scheme://3ds-complete?status=Y").unwrap(),
            &callback()
        ));
    }

    #[tokio::test]
    async fn test_route_delivers_to_pending_challenge() {
        let pending: PendingCallback = Arc::new(Mutex::new(None));
        let router = DeepLinkRouter::new(callback(), pending.clone());

        assert!(!router.route("app-scheme://3ds-complete?status=Y"));

        let (tx, rx) = oneshot::channel();
        *pending.lock().unwrap() = Some(tx);

        assert!(!router.route("other-scheme://somewhere"));
        assert!(!router.route("not a uri"));
        assert!(router.route("app-scheme://3ds-complete?transactionId=tx-1&status=Y"));
        // Only one delivery per pending challenge.
        assert!(!router.route("app-scheme://3ds-complete?status=Y"));

        let delivered = rx.await.unwrap();
        assert_eq!(
            DeepLinkCallback::from_url(&delivered).transaction_id.as_deref(),
            Some("tx-1")
        );
    }
}
