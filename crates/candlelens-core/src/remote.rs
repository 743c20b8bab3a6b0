//! Client for the remote inference service.
//!
//! | Call | Route |
//! |------|-------|
//! | [`InferenceClient::analyze`] | `POST {endpoint}/api/analyze` |
//! | [`InferenceClient::health`] | `GET {endpoint}/health` |
//! | [`InferenceClient::news`] | `GET {endpoint}/api/news/{symbol}` |
//!
//! Every call is exactly one attempt bounded by the configured timeout.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::{ChartData, Insight, NewsSentiment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// No response: connection refused, DNS failure, timeout.
    Transport,
    /// A response arrived with a non-2xx status.
    Status,
    /// A 2xx response whose body did not decode.
    Decode,
}

/// Structured failure talking to the inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    kind: RemoteErrorKind,
    message: String,
    status: Option<u16>,
}

impl RemoteError {
    pub fn transport(error: &HttpError) -> Self {
        Self {
            kind: RemoteErrorKind::Transport,
            message: format!("inference service unreachable: {}", error.message()),
            status: None,
        }
    }

    pub fn status(response: &HttpResponse) -> Self {
        Self {
            kind: RemoteErrorKind::Status,
            message: format!("inference service returned status {}", response.status),
            status: Some(response.status),
        }
    }

    pub fn decode(what: &str, error: &serde_json::Error) -> Self {
        Self {
            kind: RemoteErrorKind::Decode,
            message: format!("failed to decode {what} response: {error}"),
            status: None,
        }
    }

    pub const fn kind(&self) -> RemoteErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn http_status(&self) -> Option<u16> {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            RemoteErrorKind::Transport => "remote.transport",
            RemoteErrorKind::Status => "remote.status",
            RemoteErrorKind::Decode => "remote.decode",
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for RemoteError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "healthy" | "ok")
    }
}

/// Raw news payload: headlines and a score in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsDigest {
    #[serde(default)]
    pub headlines: Vec<String>,
    #[serde(alias = "sentiment_score")]
    pub sentiment: f64,
}

impl NewsDigest {
    pub fn into_sentiment(self) -> NewsSentiment {
        NewsSentiment::from_score(self.sentiment, self.headlines)
    }
}

#[derive(Serialize)]
struct AnalyzeBody<'a> {
    #[serde(flatten)]
    data: &'a ChartData,
    #[serde(skip_serializing_if = "Option::is_none")]
    gemini_api_key: Option<&'a str>,
}

/// Thin typed wrapper over an [`HttpClient`].
#[derive(Clone)]
pub struct InferenceClient {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl InferenceClient {
    pub fn new(http_client: Arc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            api_key: None,
            timeout_ms: crate::http_client::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn analyze(&self, data: &ChartData) -> Result<Insight, RemoteError> {
        let body = AnalyzeBody {
            data,
            gemini_api_key: self.api_key.as_deref(),
        };
        let body = serde_json::to_string(&body)
            .map_err(|error| RemoteError::decode("analyze request", &error))?;
        let request = HttpRequest::post_json(self.url("/api/analyze"), body);

        let response = self.send(request).await?;
        serde_json::from_str(&response.body).map_err(|error| RemoteError::decode("analyze", &error))
    }

    /// Check liveness. A non-2xx status is an error, but a 2xx body that does
    /// not parse still counts as an answer with status `ok`.
    pub async fn health(&self) -> Result<HealthReport, RemoteError> {
        let response = self.send(HttpRequest::get(self.url("/health"))).await?;
        Ok(serde_json::from_str(&response.body).unwrap_or_else(|_| HealthReport {
            status: String::from("ok"),
            service: None,
            version: None,
        }))
    }

    pub async fn news(&self, symbol: &str) -> Result<NewsDigest, RemoteError> {
        let path = format!("/api/news/{}", urlencoding::encode(symbol));
        let response = self.send(HttpRequest::get(self.url(&path))).await?;
        serde_json::from_str(&response.body).map_err(|error| RemoteError::decode("news", &error))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        let request = request.with_timeout_ms(self.timeout_ms);
        debug!(method = request.method.as_str(), url = %request.url, "calling inference service");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| RemoteError::transport(&error))?;

        if !response.is_success() {
            return Err(RemoteError::status(&response));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
