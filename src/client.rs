//! HTTP client for the remote completion service.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::coordinator::CompletionBackend;
use crate::session::Message;

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatResponse {
    message: String,
}

/// The service is stateless: no session identifier, the full ordered history
/// goes out with every call.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    base_url: String,
}

impl CompletionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { messages })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "chat request failed with status: {}",
                response.status()
            ));
        }

        let chat: ChatResponse = response.json().await?;
        Ok(chat.message)
    }
}
