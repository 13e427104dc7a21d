//! services/api/src/adapters/story_llm.rs
//!
//! This module contains the adapter for the story-writing LLM.
//! It implements the `TextGenerationService` port from the `core` crate on top of
//! any OpenAI-compatible chat-completions endpoint (OpenAI itself, or Gemini's
//! OpenAI surface).
//!
//! The request is sent with `reqwest` directly so the HTTP status stays visible:
//! a 429 is a quota failure no matter how the provider words its error body.
//! Nothing is retried here; a failed call fails the request that made it.

use async_openai::{
    config::{Config, OpenAIConfig},
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use reqwest::StatusCode;
use saga_core::{
    ports::{classify_model_failure, PortError, PortResult, TextGenerationService},
    prompt::AssembledPrompt,
};
use serde_json::Value;
use tracing::{debug, error};

/// Error codes and statuses providers use for exhausted quota or rate limits.
const QUOTA_MARKERS: &[&str] = &[
    "rate_limit_exceeded",
    "insufficient_quota",
    "resource_exhausted",
];

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiStoryAdapter {
    http: reqwest::Client,
    config: OpenAIConfig,
    model: String,
}

impl OpenAiStoryAdapter {
    /// Creates a new `OpenAiStoryAdapter`. The config supplies the base url and the key.
    pub fn new(http: reqwest::Client, config: OpenAIConfig, model: String) -> Self {
        Self {
            http,
            config,
            model,
        }
    }
}

fn builder_error(e: OpenAIError) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps a non-success response to a port error.
fn classify_http_failure(status: StatusCode, body: &str) -> PortError {
    let message = format!("{}: {}", status, body);
    if status == StatusCode::TOO_MANY_REQUESTS || error_code_is_quota(body) {
        return PortError::QuotaExceeded(message);
    }
    classify_model_failure(message)
}

/// Looks for a quota code in an OpenAI error object or a Gemini error list.
fn error_code_is_quota(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    let errors = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    errors.iter().any(|item| {
        let error = item.get("error").unwrap_or(item);
        ["code", "type", "status"].iter().any(|field| {
            error
                .get(*field)
                .and_then(Value::as_str)
                .map(|code| QUOTA_MARKERS.contains(&code.to_lowercase().as_str()))
                .unwrap_or(false)
        })
    })
}

//=========================================================================================
// `TextGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationService for OpenAiStoryAdapter {
    /// Sends the system instruction and user message as a two-message chat.
    async fn generate(&self, prompt: &AssembledPrompt) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system_instruction.as_str())
                .build()
                .map_err(builder_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.user_message.as_str())
                .build()
                .map_err(builder_error)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(builder_error)?;

        debug!("Sending chat completion request to model {}.", self.model);
        let response = self
            .http
            .post(self.config.url("/chat/completions"))
            .headers(self.config.headers())
            .query(&self.config.query())
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_model_failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Model {} returned {}: {}", self.model, status, body);
            return Err(classify_http_failure(status, &body));
        }

        let completion: CreateChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Unreadable model response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Story LLM response contained no text content.".to_string())
            })
    }
}

//=========================================================================================
// Unit Tests
//=========================================================================================
