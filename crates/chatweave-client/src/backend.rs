//! Completion backend abstraction and the HTTP proxy implementation.

use chatweave_core::node::ChatMessage;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Failure while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },
}

/// The single network boundary the canvas consumes.
///
/// Implementations take the full conversation history plus the node's model
/// alias and resolve to the assistant's reply text. Swappable so tests can
/// run without a server.
pub trait CompletionBackend: Send + Sync {
    /// Request one completion for the given history.
    fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Backend that posts to the Chatweave completion proxy over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    /// Create a backend targeting the proxy's chat endpoint, e.g.
    /// `http://localhost:3030/api/chat`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl CompletionBackend for HttpBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { messages, model })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<ChatResponse>().await?.response)
    }
}
