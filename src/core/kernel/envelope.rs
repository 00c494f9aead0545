use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{HmacSigner, Signer};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{instrument, trace};

/// Which half of the API a path lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Public,
    Private,
}

impl Scope {
    #[must_use]
    pub const fn base_path(self) -> &'static str {
        match self {
            Self::Public => "/public",
            Self::Private => "/private",
        }
    }
}

/// One fully-signed, ready-to-send HTTP request.
///
/// Immutable once built: the timestamp is captured at build time and the
/// signature is bound to it, so an envelope must not be rewritten before it
/// is sent.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl SignedEnvelope {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Builds signed envelopes for one client instance
pub struct EnvelopeFactory {
    base_url: String,
    api_key: String,
    signer: Arc<dyn Signer>,
}

impl EnvelopeFactory {
    pub fn new(config: &ExchangeConfig) -> Self {
        Self {
            base_url: config.resolved_base_url().to_string(),
            api_key: config.api_key().to_string(),
            signer: Arc::new(HmacSigner::new(config.secret_key().to_string())),
        }
    }

    /// Build a signed envelope for one request.
    ///
    /// The signature covers the path only; query parameters are appended to
    /// the URL unsigned, matching the exchange's contract.
    pub fn build(
        &self,
        method: Method,
        scope: Scope,
        path: &str,
        query: &[(&str, &str)],
        body: &[u8],
    ) -> Result<SignedEnvelope, ExchangeError> {
        let timestamp_ms = unix_millis()?;
        let signature = self.signer.sign(timestamp_ms, method.as_str(), path, body)?;

        let mut url = Url::parse(&format!("{}{}{}", self.base_url, scope.base_path(), path))
            .map_err(|e| ExchangeError::InvalidParameters(format!("invalid URL: {e}")))?;
        for (key, value) in query {
            url.query_pairs_mut().append_pair(key, value);
        }

        let mut headers = HeaderMap::new();
        headers.insert("API-KEY", header_value(&self.api_key)?);
        headers.insert("API-TIMESTAMP", header_value(&timestamp_ms.to_string())?);
        headers.insert("API-SIGN", header_value(&signature)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        Ok(SignedEnvelope {
            method,
            url,
            headers,
            body: body.to_vec(),
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ExchangeError> {
    HeaderValue::from_str(value)
        .map_err(|e| ExchangeError::InvalidParameters(format!("invalid header value: {e}")))
}

fn unix_millis() -> Result<u64, ExchangeError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|e| ExchangeError::Other(format!("failed to get timestamp: {e}")))
}

/// Transport executes one envelope against the network.
///
/// The trait is the seam between the dispatcher and the wire: production
/// uses [`HttpTransport`], tests inject instrumented fakes. Implementations
/// carry no shared mutable state; the dispatcher guarantees only one round
/// trip is ever in flight per client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform exactly one network round trip and read the full body.
    async fn round_trip(&self, envelope: &SignedEnvelope) -> Result<Vec<u8>, ExchangeError>;
}

/// reqwest-backed transport with a total round-trip timeout.
///
/// `pool_max_idle_per_host(1)` keeps at most one idle connection to the
/// exchange host; it does not cap concurrent connections. Exclusivity of
/// round trips is enforced by the dispatcher's serialized worker, not here.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, envelope), fields(method = %envelope.method(), path = %envelope.url().path()))]
    async fn round_trip(&self, envelope: &SignedEnvelope) -> Result<Vec<u8>, ExchangeError> {
        let mut request = self
            .client
            .request(envelope.method().clone(), envelope.url().clone())
            .headers(envelope.headers().clone());

        if !envelope.body().is_empty() {
            request = request.body(envelope.body().to_vec());
        }

        let response = request.send().await?;
        let bytes = response.bytes().await?;
        trace!(len = bytes.len(), "response body read");
        Ok(bytes.to_vec())
    }
}
