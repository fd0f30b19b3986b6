// ============================================================================
// File: src/llm_client.rs
// OpenRouter chat-completion client and its HTTP transport
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::config::{Config, SamplingParams};
use crate::error::LlmError;
use crate::models::{ApiErrorBody, CompletionRequest, CompletionResponse, Message};
use crate::prompts;

/// Outbound call as seen by a transport
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: CompletionRequest,
}

/// Raw status and body handed back by a transport
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP round trip. Swapped out in tests to avoid the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, LlmError>;
}

/// Transport backed by a shared `reqwest::Client`. No timeout is applied.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, LlmError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| LlmError::InvalidHeader(format!("{}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| LlmError::InvalidHeader(format!("{}: {}", name, e)))?;
            headers.insert(name, value);
        }

        // `headers` replaces the content type `json` set, so it is not sent twice
        let response = self
            .client
            .post(&request.url)
            .json(&request.body)
            .headers(headers)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

pub struct LlmClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: String,
    default_model: String,
    site_url: String,
    app_title: String,
    sampling: SamplingParams,
}

impl LlmClient {
    /// Client that talks to the configured provider over HTTP
    pub fn new(config: &Config) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            default_model: config.default_model.clone(),
            site_url: config.site_url.clone(),
            app_title: config.app_title.clone(),
            sampling: config.sampling.clone(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Send one chat-completion request and return the parsed body.
    ///
    /// Exactly one round trip: no retry, no timeout, no streaming.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
    ) -> Result<CompletionResponse, LlmError> {
        let model = model.unwrap_or(&self.default_model);
        let request = HttpRequest {
            url: format!("{}/chat/completions", self.base_url),
            headers: self.headers(),
            body: CompletionRequest::new(model, messages, &self.sampling),
        };

        tracing::debug!(
            model,
            messages = request.body.messages.len(),
            max_tokens = request.body.max_tokens,
            "sending chat completion request"
        );

        let result = self.round_trip(request).await;
        if let Err(err) = &result {
            tracing::warn!(model, error = %err, retryable = err.is_retryable(), "OpenRouter API error");
        }
        result
    }

    /// Answer an open medical question, optionally grounded in patient context
    pub async fn get_medical_assistant_response(
        &self,
        user_message: &str,
        patient_context: Option<&str>,
        conversation_history: &[Message],
    ) -> Result<String, LlmError> {
        let messages = prompts::medical_query(user_message, patient_context, conversation_history);
        self.first_message(messages).await
    }

    /// Ask for urgency, specialist, duration, preparation and notes for a visit
    pub async fn get_appointment_recommendation(
        &self,
        symptoms: &str,
        patient_history: &str,
    ) -> Result<String, LlmError> {
        let messages = prompts::appointment_recommendation(symptoms, patient_history);
        self.first_message(messages).await
    }

    pub async fn analyze_medical_data(
        &self,
        lab_results: &str,
        vital_signs: &str,
        medications: &str,
    ) -> Result<String, LlmError> {
        let messages = prompts::lab_analysis(lab_results, vital_signs, medications);
        self.first_message(messages).await
    }

    async fn first_message(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let response = self.complete(messages, None).await?;

        let usage = response.usage;
        tracing::debug!(
            id = %response.id,
            model = %response.model,
            finish_reason = response.choices.first().and_then(|c| c.finish_reason.as_deref()),
            prompt_tokens = usage.map(|u| u.prompt_tokens),
            completion_tokens = usage.map(|u| u.completion_tokens),
            total_tokens = usage.map(|u| u.total_tokens),
            "completion received"
        );

        response
            .first_content()
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }

    async fn round_trip(&self, request: HttpRequest) -> Result<CompletionResponse, LlmError> {
        let response = self.transport.post(request).await?;

        if !response.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&response.body)
                .ok()
                .and_then(ApiErrorBody::into_message);
            return Err(LlmError::api(response.status, message));
        }

        serde_json::from_str(&response.body).map_err(|e| LlmError::Decode(e.to_string()))
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
            ("HTTP-Referer".to_string(), self.site_url.clone()),
            ("X-Title".to_string(), self.app_title.clone()),
        ]
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    pub fn test_config(base_url: &str) -> Config {
        Config {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            default_model: "test/model".to_string(),
            ..Config::default()
        }
    }

    pub fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "gen-123",
            "created": 1_717_000_000,
            "model": "test/model",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    /// Plays back queued replies in order and records every request it sees
    #[derive(Default)]
    pub struct FakeTransport {
        replies: Mutex<VecDeque<Result<HttpResponse, LlmError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        pub fn replying(status: u16, body: serde_json::Value) -> Arc<Self> {
            let transport = Self::default();
            transport.push_reply(status, body);
            Arc::new(transport)
        }

        pub fn push_reply(&self, status: u16, body: serde_json::Value) {
            self.replies.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
        }

        pub fn push_failure(&self, reason: &str) {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(LlmError::Transport(reason.to_string())));
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn post(&self, request: HttpRequest) -> Result<HttpResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Transport("no reply queued".to_string())))
        }
    }
}
