//! Message history seam plus an in-memory implementation.

use crate::message::{Channel, Message};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Read access to the host's message history.
pub trait MessageStore: Send + Sync {
    /// Messages of a channel, newest first.
    fn get_messages(&self, channel_id: &str) -> Vec<Message>;

    fn get_channel(&self, channel_id: &str) -> Option<Channel>;
}

#[derive(Debug, Default)]
struct ChannelLog {
    channel: Option<Channel>,
    /// Oldest first; reversed on read
    messages: Vec<Message>,
}

/// Message history kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    channels: RwLock<HashMap<String, ChannelLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let log = channels.entry(id.clone()).or_default();
        log.channel = Some(Channel {
            id,
            name: name.into(),
        });
    }

    /// Append a message to its channel's history.
    pub fn push(&self, message: Message) {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(message.channel_id.clone())
            .or_default()
            .messages
            .push(message);
    }
}

impl MessageStore for MemoryStore {
    fn get_messages(&self, channel_id: &str) -> Vec<Message> {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(channel_id)
            .map(|log| log.messages.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    fn get_channel(&self, channel_id: &str) -> Option<Channel> {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels.get(channel_id).and_then(|log| log.channel.clone())
    }
}
