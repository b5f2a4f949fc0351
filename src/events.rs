//! Host event bus seam: subscriptions, the pre-send hook and message actions.
//!
//! Every registration hands back a [`Subscription`]; whoever registered is
//! responsible for handing it back on shutdown.

use crate::message::{Channel, Message};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ChannelSelect,
    MessageCreate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The user switched to another conversation
    ChannelSelect { channel_id: String },
    /// A message arrived in some channel
    MessageCreate { channel_id: String, message: Message },
}

impl ChatEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChatEvent::ChannelSelect { .. } => EventKind::ChannelSelect,
            ChatEvent::MessageCreate { .. } => EventKind::MessageCreate,
        }
    }
}

/// Handle for one registration on an [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(pub u64);

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &ChatEvent) -> Result<()>;
}

/// Runs before a message leaves the client and may rewrite it.
#[async_trait]
pub trait PreSendListener: Send + Sync {
    async fn before_send(&self, message: &mut Message) -> Result<()>;
}

/// How a message action is shown next to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub label: String,
    pub channel: Option<Channel>,
}

/// A per-message UI action (a popover button in the host client).
#[async_trait]
pub trait MessageAction: Send + Sync {
    /// `None` hides the action for this message.
    fn describe(&self, message: &Message) -> Option<ActionDescriptor>;

    async fn run(&self, message: &Message) -> Result<()>;
}

/// Registration surface of the host client.
pub trait EventBus: Send + Sync {
    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Subscription;

    /// Returns `false` if the subscription was unknown.
    fn unsubscribe(&self, subscription: Subscription) -> bool;

    fn add_pre_send_listener(&self, listener: Arc<dyn PreSendListener>) -> Subscription;

    fn remove_pre_send_listener(&self, subscription: Subscription) -> bool;

    fn add_message_action(&self, action: Arc<dyn MessageAction>) -> Subscription;

    fn remove_message_action(&self, subscription: Subscription) -> bool;
}
