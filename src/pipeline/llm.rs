//! Chat-model interaction: build messages and call the provider.
//!
//! [`ChatBackend`] is the seam the reshape, CSV and writing stages talk to.
//! [`LlmChat`] adapts any `edgequake_llm` provider to it. Prompt text lives
//! in [`crate::prompts`] and retry in [`crate::pipeline::retry`].

use crate::config::ChatSettings;
use crate::error::ConfigError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Failure of a single chat attempt.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Provider(String),
}

/// An inline image attached to the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatImage {
    pub base64: String,
    pub mime_type: String,
}

/// One chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub user: String,
    pub image: Option<ChatImage>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl ChatRequest {
    pub fn new(user: impl Into<String>, settings: ChatSettings) -> Self {
        Self {
            system: None,
            user: user.into(),
            image: None,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_image(mut self, base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        self.image = Some(ChatImage {
            base64: base64.into(),
            mime_type: mime_type.into(),
        });
        self
    }
}

/// A chat model reachable over the network.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request and return the assistant's text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

/// [`ChatBackend`] over an `edgequake_llm` provider.
pub struct LlmChat {
    provider: Arc<dyn LLMProvider>,
}

impl LlmChat {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Instantiate a named provider with the given model.
    pub fn from_factory(provider_name: &str, model: &str) -> Result<Self, ConfigError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            ConfigError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider))
    }
}

/// Message layout: optional system turn, then one user turn carrying the
/// text and, for vision calls, the image.
fn build_messages(request: &ChatRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system {
        messages.push(ChatMessage::system(system.as_str()));
    }
    match &request.image {
        Some(image) => messages.push(ChatMessage::user_with_images(
            request.user.as_str(),
            vec![ImageData::new(image.base64.clone(), image.mime_type.as_str())],
        )),
        None => messages.push(ChatMessage::user(request.user.as_str())),
    }
    messages
}

fn build_options(request: &ChatRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl ChatBackend for LlmChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let start = Instant::now();
        let messages = build_messages(request);
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ChatError::Provider(e.to_string()))?;

        debug!(
            "Chat: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ChatSettings {
        ChatSettings {
            temperature: 0.05,
            max_tokens: 8192,
        }
    }

    #[test]
    fn build_options_carries_settings() {
        let opts = build_options(&ChatRequest::new("hi", settings()));
        assert_eq!(opts.temperature, Some(0.05));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn system_turn_is_optional() {
        assert_eq!(build_messages(&ChatRequest::new("hi", settings())).len(), 1);
        let req = ChatRequest::new("hi", settings()).with_system("be terse");
        assert_eq!(build_messages(&req).len(), 2);
    }

    #[test]
    fn image_is_attached_to_request() {
        let req = ChatRequest::new("read this", settings()).with_image("AAAA", "image/jpeg");
        let image = req.image.as_ref().unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(build_messages(&req).len(), 1);
    }
}
