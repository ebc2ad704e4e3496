//! HTTP client for the RAG customer-service backend.
//!
//! Provides the streaming chat call (SSE over a chunked POST body) and the
//! REST reads used to list and reload persisted conversations.

use futures_util::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::models::{ChatStreamRequest, ConversationDetail, ConversationSummary};
use crate::sse::{FrameDecoder, StreamEvent};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const CHAT_STREAM_PATH: &str = "/api/v1/agent/chat/stream";
const CONVERSATIONS_PATH: &str = "/api/v1/conversations";

/// Cooperative cancellation handle for an in-flight stream.
///
/// Cloning shares the flag. The transport checks it between chunk reads, so
/// cancellation takes effect at the next read boundary and the stream ends
/// with [`ApiError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the associated stream.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Client for the backend API.
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client against the default base URL, unauthenticated.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL.
    pub fn with_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client: reqwest::Client::new(),
        }
    }

    /// Attach a bearer token used for all subsequent requests.
    pub fn with_auth(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a bearer credential is attached.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Perform one streaming chat exchange.
    ///
    /// Issues `POST /api/v1/agent/chat/stream` and decodes the response body
    /// incrementally, invoking `on_event` once per decoded frame,
    /// synchronously and in arrival order. A non-success status fails before
    /// any frame is decoded. Completion of the underlying read resolves the
    /// call even if no `done` frame was seen.
    pub async fn stream_chat(
        &self,
        request: &ChatStreamRequest,
        cancel: &CancelToken,
        mut on_event: impl FnMut(StreamEvent),
    ) -> Result<()> {
        let url = format!("{}{}", self.base_url, CHAT_STREAM_PATH);
        debug!(url = %url, "opening chat stream");

        let response = self
            .authorized(self.client.post(&url))
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Server { status, message });
        }

        let mut bytes_stream = response.bytes_stream();
        let mut decoder = FrameDecoder::new();

        loop {
            if cancel.is_cancelled() {
                info!("chat stream cancelled");
                return Err(ApiError::Cancelled);
            }

            match bytes_stream.next().await {
                Some(Ok(chunk)) => {
                    for event in decoder.feed(&chunk) {
                        on_event(event);
                    }
                }
                Some(Err(err)) => return Err(ApiError::Http(err)),
                None => break,
            }
        }

        if let Some(event) = decoder.finish() {
            on_event(event);
        }

        debug!("chat stream ended");
        Ok(())
    }

    /// List persisted conversations, optionally filtered by bot.
    pub async fn fetch_conversations(
        &self,
        bot_id: Option<&str>,
    ) -> Result<Vec<ConversationSummary>> {
        let url = format!("{}{}", self.base_url, CONVERSATIONS_PATH);
        let mut request = self.authorized(self.client.get(&url));
        if let Some(bot_id) = bot_id {
            request = request.query(&[("bot_id", bot_id)]);
        }

        let response = request.send().await?;
        self.json_or_error(response).await
    }

    /// Fetch one conversation's full history.
    pub async fn fetch_conversation(&self, conversation_id: &str) -> Result<ConversationDetail> {
        let url = format!(
            "{}{}/{}",
            self.base_url, CONVERSATIONS_PATH, conversation_id
        );

        let response = self.authorized(self.client.get(&url)).send().await?;
        self.json_or_error(response).await
    }

    async fn json_or_error<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Server { status, message });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}
