//! Chat message and translation types shared by every layer of the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token embedded in translated outgoing bodies.
///
/// Receivers running this same pipeline treat any incoming message containing it
/// as already carrying a translation and never send it to the provider again.
pub const OUTBOUND_MARKER: &str = "|>>";

/// A chat message as seen by the host client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub content: Option<String>,
    pub channel_id: String,
}

impl Message {
    pub fn new(id: impl Into<String>, channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Some(content.into()),
            channel_id: channel_id.into(),
        }
    }

    /// Text eligible for translation.
    ///
    /// Absent and empty content are treated the same: there is nothing to send
    /// to the provider.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    /// Whether the body already embeds a translation produced by this pipeline.
    pub fn carries_translation(&self) -> bool {
        self.content
            .as_deref()
            .is_some_and(|c| c.contains(OUTBOUND_MARKER))
    }
}

/// Result of a single provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub source_language: String,
    pub text: String,
}

impl Translation {
    pub fn new(source_language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            text: text.into(),
        }
    }

    /// An empty text means "nothing renderable".
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Which way a message is travelling; selects the language pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel metadata handed to UI actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// Compose the body actually transmitted for a translated outgoing message.
///
/// Format: newline, translated text, newline, marker, space, original text, newline.
/// Other instances rely on this layout byte for byte.
pub fn compose_outbound(translated: &str, original: &str) -> String {
    format!("\n{}\n{} {}\n", translated, OUTBOUND_MARKER, original)
}
