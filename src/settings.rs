//! User-facing translation settings.
//!
//! The host owns these values and may change them at any time; the pipeline
//! holds a `watch::Receiver` and reads the latest value on every event.

use crate::message::Direction;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Language code meaning "let the provider detect the source language".
pub const AUTO_DETECT: &str = "auto";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Translate our own messages before they are sent
    pub auto_translate_outgoing: bool,
    /// Translate incoming messages in the active channel as they arrive
    pub auto_translate_live_chat: bool,
    pub received_input: String,
    pub received_output: String,
    pub sent_input: String,
    pub sent_output: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_translate_outgoing: false,
            auto_translate_live_chat: false,
            received_input: AUTO_DETECT.to_string(),
            received_output: "en".to_string(),
            sent_input: AUTO_DETECT.to_string(),
            sent_output: "en".to_string(),
        }
    }
}

impl Settings {
    /// Source and target language codes for a direction.
    pub fn languages(&self, direction: Direction) -> (&str, &str) {
        match direction {
            Direction::Incoming => (&self.received_input, &self.received_output),
            Direction::Outgoing => (&self.sent_input, &self.sent_output),
        }
    }
}

/// Read side of the host-owned settings.
pub type SettingsHandle = watch::Receiver<Settings>;

/// Create a settings channel seeded with `initial`.
pub fn channel(initial: Settings) -> (watch::Sender<Settings>, SettingsHandle) {
    watch::channel(initial)
}
