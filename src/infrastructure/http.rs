use super::wire::{InitializeResponseBody, StatusResponseBody, TokenizeResponseBody};
use crate::domain::gateway::{InitializeRequest, Initialization};
use crate::domain::ports::GatewayClient;
use crate::domain::status::StatusSnapshot;
use crate::domain::token::{TokenDescriptor, TokenizeRequest};
use crate::error::{GatewayError, PaymentError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway client speaking JSON over HTTP.
///
/// Endpoints, relative to the base URL:
/// `POST tokenize`, `POST payments` and
/// `GET payments/{paymentKey}/methods/{methodId}/status`.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::ConfigError(format!("http client: {e}")))?;
        // A trailing slash keeps `join` from replacing the last path segment.
        let base_url = if base_url.path().ends_with('/') {
            base_url
        } else {
            let mut url = base_url;
            let path = format!("{}/", url.path());
            url.set_path(&path);
            url
        };
        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Network(format!("bad endpoint {path}: {e}")))
    }

    /// Gateway-issued identifiers are pushed as encoded path segments.
    fn status_endpoint(
        &self,
        payment_key: &str,
        method_id: &str,
    ) -> std::result::Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Network(format!("bad gateway URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["payments", payment_key, "methods", method_id, "status"]);
        Ok(url)
    }

    async fn read<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> std::result::Result<T, GatewayError> {
        let status = response.status();
        // Rejections carry a JSON body with a code and message, so only
        // server errors are treated as transport failures.
        if status.is_server_error() {
            return Err(GatewayError::Network(format!("server returned {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Network(format!("invalid JSON: {e}")))
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Network(format!("HTTP request failed: {e}"))
}

#[async_trait]
impl GatewayClient for HttpGateway {
    async fn tokenize(
        &self,
        request: TokenizeRequest,
    ) -> std::result::Result<TokenDescriptor, GatewayError> {
        let url = self.endpoint("tokenize")?;
        debug!(%url, "tokenize");
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        Self::read::<TokenizeResponseBody>(response)
            .await?
            .into_descriptor()
    }

    async fn initialize(
        &self,
        request: InitializeRequest,
    ) -> std::result::Result<Initialization, GatewayError> {
        let url = self.endpoint("payments")?;
        debug!(%url, "initialize");
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        Self::read::<InitializeResponseBody>(response)
            .await?
            .into_initialization()
    }

    async fn poll_status(
        &self,
        payment_key: &str,
        method_id: &str,
    ) -> std::result::Result<StatusSnapshot, GatewayError> {
        let url = self.status_endpoint(payment_key, method_id)?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        Ok(Self::read::<StatusResponseBody>(response)
            .await?
            .into_snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_keep_base_path() {
        let gateway = HttpGateway::new(Url::parse("https://gw.example/api/v1").unwrap()).unwrap();
        assert_eq!(
            gateway.endpoint("tokenize").unwrap().as_str(),
            "https://gw.example/api/v1/tokenize"
        );
        assert_eq!(
            gateway.status_endpoint("pk-1", "m-1").unwrap().as_str(),
            "https://gw.example/api/v1/payments/pk-1/methods/m-1/status"
        );
    }

    #[test]
    fn test_status_endpoint_encodes_identifiers() {
        let gateway = HttpGateway::new(Url::parse("https://gw.example/api/v1/").unwrap()).unwrap();
        let url = gateway.status_endpoint("pk/1?x#y", "m 1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://gw.example/api/v1/payments/pk%2F1%3Fx%23y/methods/m%201/status"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }
}
