//! OpenAI chat completions backend
//!
//! One user message per call, `temperature: 0`, no streaming.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use stachat_core::{ConfigurationError, GenerationBackend, GenerationError, ModelId};
use tracing::{debug, error};

use crate::generation::models::ModelAllowList;

pub struct OpenAiChatBackend {
    api_key: String,
    client: Client,
    base_url: String,
    model: ModelId,
    timeout: Duration,
}

impl OpenAiChatBackend {
    /// Fails with [`ConfigurationError::UnsupportedModel`] when `model` is not
    /// in `allow_list`.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: &str,
        allow_list: &ModelAllowList,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let model = allow_list.resolve(model)?;
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingCredential(
                "OPENAI_API_KEY".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                field: "generation".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            api_key,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            timeout,
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiChatBackend {
    fn model(&self) -> &ModelId {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: self.model.as_str(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending chat request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout.as_secs())
                } else {
                    error!("OpenAI API request failed: {}", e);
                    GenerationError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("OpenAI API error ({}): {}", status, message);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
