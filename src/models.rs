// ============================================================================
// File: src/models.rs
// Chat-completion request and response models
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::config::SamplingParams;

/// Author of a chat message
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged entry in a conversation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Request body for `POST {base}/chat/completions`
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stream: bool,
}

impl CompletionRequest {
    /// Build a non-streaming request with the given sampling parameters
    pub fn new(model: impl Into<String>, messages: Vec<Message>, sampling: &SamplingParams) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            top_p: sampling.top_p,
            frequency_penalty: sampling.frequency_penalty,
            presence_penalty: sampling.presence_penalty,
            stream: false,
        }
    }
}

/// Successful response body from the chat-completion endpoint
#[derive(Debug, Deserialize, Clone)]
#[allow(dead_code)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// Text of the first choice, if the provider returned one
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|choice| choice.message.content.as_str())
    }
}

/// Individual response choice
#[derive(Debug, Deserialize, Clone)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

/// Message in API response; some providers omit the role or send null content
#[derive(Debug, Deserialize, Clone)]
#[allow(dead_code)]
pub struct ResponseMessage {
    #[serde(default = "default_response_role")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

fn default_response_role() -> Role {
    Role::Assistant
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Token usage information. Only logged, so missing counts read as zero.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Error body returned with a non-success status.
///
/// Providers disagree on the shape: some put `message` at the top level,
/// OpenRouter nests it under `error`.
#[derive(Debug, Deserialize, Default)]
pub struct ApiErrorBody {
    pub message: Option<String>,
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or_else(|| self.error.and_then(|detail| detail.message))
            .filter(|message| !message.is_empty())
    }
}
