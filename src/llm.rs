//! OpenAI-compatible chat transport and the two model-backed collaborators:
//! route ordering and photo address recognition.
//!
//! Both ask the model for a JSON object and hand back the parsed, still
//! unvalidated reply. Validation happens in the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{LlmConfig, resolve_api_key};
use crate::error::ProviderError;
use crate::traits::{AddressRecognizer, OptimizeRequest, RawOptimization, RawRecognition, RouteOptimizer};

const OPTIMIZE_INSTRUCTIONS: &str = "You plan efficient driving routes. Given a JSON list of \
addresses, order them to minimise total travel distance, starting near the origin location when \
one is given. Reply with a JSON object {\"optimizedRoute\": [..], \"reasoning\": \"..\"}. Every \
address in optimizedRoute must be copied exactly as supplied: same spelling, case, punctuation \
and spacing. Do not add or omit addresses.";

const RECOGNIZE_INSTRUCTIONS: &str = "Extract the postal address shown in the image. Reply with a \
JSON object {\"address\": \"..\"}. Use an empty string when no address is visible.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message carrying text and one inline image.
    pub fn user_with_image(text: impl Into<String>, data_uri: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: data_uri.into() },
                },
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Minimal chat-completions client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Sends `messages` and returns the first choice's text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let api_key = resolve_api_key(self.config.api_key.as_deref(), &self.config.api_key_env)?;
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            response_format: ResponseFormat { kind: "json_object" },
        };
        debug!(model = %self.config.model, messages = messages.len(), "sending chat completion request");

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::InvalidResponse(format!("failed to parse response: {err}")))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))
    }

    /// Like [`complete`](Self::complete), then parses the reply as JSON.
    pub async fn complete_json<T: DeserializeOwned>(&self, messages: &[ChatMessage]) -> Result<T, ProviderError> {
        let content = self.complete(messages).await?;
        parse_json_reply(&content)
    }
}

/// Parses a model reply, tolerating a surrounding markdown code fence.
pub fn parse_json_reply<T: DeserializeOwned>(content: &str) -> Result<T, ProviderError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim())
        .map_err(|err| ProviderError::InvalidResponse(format!("reply is not the expected JSON: {err}")))
}

/// Route ordering delegated to a chat model.
#[derive(Debug, Clone)]
pub struct LlmRouteOptimizer {
    client: ChatClient,
}

impl LlmRouteOptimizer {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RouteOptimizer for LlmRouteOptimizer {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<RawOptimization, ProviderError> {
        let payload = serde_json::to_string(request)?;
        let messages = [ChatMessage::system(OPTIMIZE_INSTRUCTIONS), ChatMessage::user(payload)];
        self.client.complete_json(&messages).await
    }
}

/// Address extraction from a photo, delegated to a vision-capable model.
#[derive(Debug, Clone)]
pub struct LlmAddressRecognizer {
    client: ChatClient,
}

impl LlmAddressRecognizer {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AddressRecognizer for LlmAddressRecognizer {
    async fn recognize(&self, data_uri: &str) -> Result<RawRecognition, ProviderError> {
        let messages = [
            ChatMessage::system(RECOGNIZE_INSTRUCTIONS),
            ChatMessage::user_with_image("Which address is in this photo?", data_uri),
        ];
        self.client.complete_json(&messages).await
    }
}
