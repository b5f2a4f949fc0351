use crate::config::Config;
use crate::error::ProviderError;
use crate::message::{Direction, Translation};
use crate::retry::{with_retry_if, RetryConfig};
use crate::settings::{SettingsHandle, AUTO_DETECT};
use crate::translator::Translator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct TranslationRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// The JSON object the model is asked to reply with
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderReply {
    #[serde(default)]
    source_language: Option<String>,
    text: String,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

/// Build the system prompt for one chat message
fn build_system_prompt(source: &str, target: &str) -> String {
    let from = if source == AUTO_DETECT {
        String::new()
    } else {
        format!("from {} ", source)
    };

    format!(
        r#"You are a translation engine inside a chat client. Translate the user's chat message {}to {}.

Rules:
- Preserve emojis, @mentions, URLs, code and markdown formatting exactly
- Keep the tone and register of the original message
- If the message is already in {}, return it unchanged

Reply with only a JSON object of the form:
{{"sourceLanguage": "<ISO 639-1 code of the original message>", "text": "<translated message>"}}"#,
        from, target, target
    )
}

/// Translator backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    retry: RetryConfig,
    settings: SettingsHandle,
}

impl OpenAiTranslator {
    pub fn new(config: &Config, settings: SettingsHandle) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.openai_api_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            retry: RetryConfig::provider_call(config.provider_max_attempts),
            settings,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(&self, source: &str, target: &str, text: &str) -> TranslationRequest {
        // Reasoning models don't support temperature - use reasoning_effort instead
        let is_reasoning = is_reasoning_model(&self.model);

        TranslationRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: build_system_prompt(source, target),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            max_completion_tokens: if is_reasoning { 4000 } else { 1000 },
            temperature: if is_reasoning { None } else { Some(0.2) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        }
    }

    async fn send(&self, request: &TranslationRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .context("Failed to send translation request")?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(ProviderError::Status { status, body }.into());
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse translation response")?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::NoChoices.into())
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, direction: Direction, text: &str) -> Result<Translation> {
        let (source, target) = {
            let settings = self.settings.borrow();
            let (source, target) = settings.languages(direction);
            (source.to_string(), target.to_string())
        };

        let request = self.build_request(&source, &target, text);

        let content = with_retry_if(
            &self.retry,
            &format!("Translation ({}, {} -> {})", direction, source, target),
            || {
                let request = &request;
                async move { self.send(request).await }
            },
            is_retryable_error,
        )
        .await?;

        debug!("Provider replied with {} bytes", content.len());
        parse_reply(&content, &source)
    }
}

/// Determine if an error is retryable (5xx errors, 429 rate limit, network errors)
/// Other 4xx client errors and malformed replies should not be retried
fn is_retryable_error(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<ProviderError>() {
        Some(provider_error) => provider_error.is_transient(),
        // Retry network errors, timeouts, and other transient failures
        None => true,
    }
}

/// Turn the model's reply into a [`Translation`].
///
/// Tolerates a markdown code fence around the JSON. A missing source language
/// falls back to the configured input language, or "unknown" when auto-detecting.
fn parse_reply(content: &str, configured_source: &str) -> Result<Translation> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let reply: ProviderReply = serde_json::from_str(json)
        .map_err(|e| ProviderError::MalformedReply(format!("{} in {:?}", e, trimmed)))?;

    let source_language = match reply.source_language {
        Some(code) if !code.is_empty() => code,
        _ if configured_source != AUTO_DETECT => configured_source.to_string(),
        _ => "unknown".to_string(),
    };

    Ok(Translation {
        source_language,
        text: reply.text,
    })
}
