use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use rustls::{ClientConfig, crypto::aws_lc_rs};
use rustls_platform_verifier::BuilderVerifierExt;
use tracing::debug;

use super::client::{FetchResponse, RequestOptions, Transport};
use crate::error::TransportError;

pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Builds a reqwest client on rustls with the platform certificate verifier.
///
/// No client-level timeout is set, deadlines are enforced per attempt by
/// [`RetrievalClient`](super::RetrievalClient).
pub fn default_client() -> Result<Client, TransportError> {
    let provider = Arc::new(aws_lc_rs::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Other(format!("TLS protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| TransportError::Other(format!("platform verifier: {e}")))?
        .with_no_client_auth();

    Ok(Client::builder().use_preconfigured_tls(tls_config).build()?)
}

/// [`Transport`] backed by a shared reqwest [`Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_UA),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.8,en-US;q=0.5,en;q=0.3"),
        );
        // Accept-Encoding is left to reqwest so responses are decompressed.

        Self { client, headers }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        match HeaderValue::from_str(user_agent) {
            Ok(value) => {
                self.headers.insert(reqwest::header::USER_AGENT, value);
            }
            Err(e) => {
                debug!(error = %e, "Invalid user agent; keeping default");
            }
        }
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<FetchResponse, TransportError> {
        let mut headers = self.headers.clone();
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }

        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(url = %url, %status, bytes = body.len(), "Fetched");
        Ok(FetchResponse { status, body })
    }
}
