use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use thiserror::Error;

/// Raw bytes from the upstream response body, as delivered by the transport.
pub type ByteStream = Pin<Box<dyn Stream<Item = anyhow::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to reach RAG service: {0}")]
    Request(#[from] reqwest::Error),

    #[error("RAG service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid RAG service configuration: {0}")]
    Config(#[source] anyhow::Error),
}

/// Boundary to the answer-generation service.
///
/// The service is consumed as an opaque SSE producer; implementations only
/// establish the stream and hand back the raw bytes.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn open_chat_stream(
        &self,
        query: &str,
        locale: &str,
    ) -> Result<ByteStream, UpstreamError>;
}

#[derive(Serialize)]
struct RagChatRequest<'a> {
    query: &'a str,
    locale: &'a str,
}

/// HTTP client for the RAG service (reqwest direct, no SDK).
///
/// Constructed once at startup and injected wherever a stream is opened, so
/// connection pooling is shared without a hidden singleton.
pub struct RagClient {
    http_client: reqwest::Client,
    chat_url: reqwest::Url,
}

impl RagClient {
    /// Build a client for the given chat endpoint URL. `timeout` bounds the
    /// whole request including the streamed body; `None` leaves only the
    /// transport-level connection timeouts in place.
    pub fn new(chat_url: &str, timeout: Option<Duration>) -> Result<Self, UpstreamError> {
        let chat_url = reqwest::Url::parse(chat_url)
            .context("invalid RAG chat URL")
            .map_err(UpstreamError::Config)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            chat_url,
        })
    }
}

#[async_trait]
impl UpstreamClient for RagClient {
    async fn open_chat_stream(
        &self,
        query: &str,
        locale: &str,
    ) -> Result<ByteStream, UpstreamError> {
        let response = self
            .http_client
            .post(self.chat_url.clone())
            .json(&RagChatRequest { query, locale })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status, body });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from));

        Ok(Box::pin(stream))
    }
}
