use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use url::Url;

/// A pending step-up authentication, as described by the initialization response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDescriptor {
    /// ACS endpoint the customer must visit.
    pub url: Url,
    /// Opaque request payload (`PaReq` for 1.x, `creq` for 2.x).
    pub payload: String,
    /// Where the ACS posts its answer.
    pub term_url: Option<Url>,
    /// Correlates the callback with this attempt (`MD` / `threeDSSessionData`).
    pub correlation_id: Option<String>,
}

impl ChallengeDescriptor {
    /// Builds a descriptor only when both the challenge URL and the request payload
    /// are present. Anything less means no challenge is required.
    pub fn from_parts(
        url: Option<&str>,
        payload: Option<&str>,
        term_url: Option<&str>,
        correlation_id: Option<&str>,
    ) -> Option<Self> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|s| !s.is_empty())
        }
        let url = Url::parse(present(url)?).ok()?;
        let payload = present(payload)?.to_string();
        Some(Self {
            url,
            payload,
            term_url: present(term_url).and_then(|t| Url::parse(t).ok()),
            correlation_id: present(correlation_id).map(str::to_string),
        })
    }

    /// Classifies the challenge protocol. Three independent signals vote and
    /// version 2 needs at least two of them.
    pub fn protocol_version(&self) -> ProtocolVersion {
        let decoded = decode_payload(&self.payload);
        let votes = [
            url_marks_v2(&self.url),
            decoded.as_ref().is_some_and(serde_json::Value::is_object),
            decoded.as_ref().is_some_and(declares_v2),
        ];
        if votes.iter().filter(|v| **v).count() >= 2 {
            ProtocolVersion::V2
        } else {
            ProtocolVersion::V1
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "1")]
    V1,
    #[serde(rename = "2")]
    V2,
}

const V2_PATH_MARKERS: [&str; 4] = ["/v2", "3ds2", "creq", "challenge"];

fn url_marks_v2(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    V2_PATH_MARKERS.iter().any(|marker| path.contains(marker))
}

/// Decodes a base64 (standard or url-safe, padded or not) JSON payload.
fn decode_payload(payload: &str) -> Option<serde_json::Value> {
    let normalized: String = payload
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn declares_v2(value: &serde_json::Value) -> bool {
    value
        .get("messageVersion")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|v| v.trim_start().starts_with('2'))
}

/// How the challenge browser hand-off ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Succeeded(ChallengeCompletion),
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeCompletion {
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    pub signal: CompletionSignal,
}

/// Which external event told us the challenge finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    /// A deep-link callback carrying the result.
    Callback,
    /// The browser was dismissed while showing our own landing page.
    LandingPage,
}
