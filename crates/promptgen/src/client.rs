//! HTTP client over the generation endpoint.

use async_trait::async_trait;

use crate::api::{PromptOutput, PromptRequest};

/// Errors surfaced by a generation call.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// The request never produced an HTTP response.
    #[error("Prompt transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Prompt endpoint returned {0}: {1}")]
    Status(u16, String),

    /// The response body was not the expected document shape.
    #[error("Prompt response decode error: {0}")]
    Decode(String),
}

/// The generation seam the chunk executor works against.
#[async_trait]
pub trait PromptClient: Send + Sync {
    async fn generate(&self, request: &PromptRequest) -> Result<PromptOutput, PromptError>;
}

/// Real client posting to a configured base URL.
///
/// No client-side timeout is configured: generation calls can legitimately
/// run for minutes on large HTML fields, and the worker is single-flight
/// anyway. A hung endpoint stalls the worker until the connection drops.
pub struct HttpPromptClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPromptClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PromptClient for HttpPromptClient {
    async fn generate(&self, request: &PromptRequest) -> Result<PromptOutput, PromptError> {
        let url = format!("{}/generate", self.base_url);
        tracing::debug!(
            request_id = %request.request_id,
            product_id = request.instruction.product_id,
            "Posting generation request to {url}",
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| PromptError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = body.chars().take(500).collect::<String>();
            return Err(PromptError::Status(status.as_u16(), detail));
        }

        response
            .json::<PromptOutput>()
            .await
            .map_err(|e| PromptError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = HttpPromptClient::new("http://prompt.local:9000/".to_string());
        assert_eq!(client.base_url, "http://prompt.local:9000");
    }
}
