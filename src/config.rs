use crate::settings::Settings;
use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // OpenAI-compatible provider
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,
    pub provider_max_attempts: u32,

    // Orchestrator
    pub throttle: Duration,
    pub cache_empty_results: bool,

    // Initial user settings
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        Ok(Self {
            // OpenAI
            openai_api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            provider_max_attempts: std::env::var("TRANSLATE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &u32| *n >= 1)
                .unwrap_or(2),

            // Orchestrator
            throttle: Duration::from_millis(
                std::env::var("TRANSLATE_THROTTLE_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            cache_empty_results: env_flag("TRANSLATE_CACHE_EMPTY").unwrap_or(false),

            // Settings
            settings: Settings {
                auto_translate_outgoing: env_flag("AUTO_TRANSLATE_OUTGOING")
                    .unwrap_or(defaults.auto_translate_outgoing),
                auto_translate_live_chat: env_flag("AUTO_TRANSLATE_LIVE_CHAT")
                    .unwrap_or(defaults.auto_translate_live_chat),
                received_input: std::env::var("RECEIVED_INPUT").unwrap_or(defaults.received_input),
                received_output: std::env::var("RECEIVED_OUTPUT")
                    .unwrap_or(defaults.received_output),
                sent_input: std::env::var("SENT_INPUT").unwrap_or(defaults.sent_input),
                sent_output: std::env::var("SENT_OUTPUT").unwrap_or(defaults.sent_output),
            },
        })
    }
}

/// Parse a boolean env var ("true"/"1"/"yes" and their negatives), ignoring anything else
fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
