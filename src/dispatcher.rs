//! In-process [`EventBus`] used by the console client and the tests.

use crate::events::{
    ActionDescriptor, ChatEvent, EventBus, EventHandler, EventKind, MessageAction,
    PreSendListener, Subscription,
};
use crate::message::Message;
use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Default)]
struct Registry {
    handlers: Vec<(Subscription, EventKind, Arc<dyn EventHandler>)>,
    pre_send: Vec<(Subscription, Arc<dyn PreSendListener>)>,
    actions: Vec<(Subscription, Arc<dyn MessageAction>)>,
}

/// Event bus that fans events out to tokio tasks.
///
/// Handlers run concurrently with each other and with whatever dispatched them,
/// the way host callbacks interleave. Must be used from within a tokio runtime.
#[derive(Default)]
pub struct Dispatcher {
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_subscription(&self) -> Subscription {
        Subscription(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn every handler subscribed to the event's kind.
    ///
    /// Handler errors are logged and dropped; nothing reaches the caller.
    pub fn dispatch(&self, event: ChatEvent) -> Vec<JoinHandle<()>> {
        let kind = event.kind();
        let handlers: Vec<_> = self
            .registry()
            .handlers
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(subscription, _, handler)| (*subscription, handler.clone()))
            .collect();

        debug!("Dispatching {:?} to {} handlers", kind, handlers.len());

        handlers
            .into_iter()
            .map(|(subscription, handler)| {
                let event = event.clone();
                tokio::spawn(async move {
                    if let Err(e) = handler.handle(&event).await {
                        warn!("Handler {} failed on {:?}: {:#}", subscription, kind, e);
                    }
                })
            })
            .collect()
    }

    /// Dispatch and wait for every spawned handler to finish.
    pub async fn dispatch_and_wait(&self, event: ChatEvent) {
        for result in join_all(self.dispatch(event)).await {
            if let Err(e) = result {
                warn!("Event handler task panicked: {}", e);
            }
        }
    }

    /// Run pre-send listeners in registration order and return the message to transmit.
    ///
    /// A failing listener aborts the send.
    pub async fn send(&self, mut message: Message) -> Result<Message> {
        let listeners: Vec<_> = self
            .registry()
            .pre_send
            .iter()
            .map(|(subscription, listener)| (*subscription, listener.clone()))
            .collect();

        for (subscription, listener) in listeners {
            listener
                .before_send(&mut message)
                .await
                .with_context(|| format!("Pre-send listener {} rejected message", subscription))?;
        }

        Ok(message)
    }

    /// Actions to show for a message.
    pub fn actions_for(&self, message: &Message) -> Vec<(Subscription, ActionDescriptor)> {
        self.registry()
            .actions
            .iter()
            .filter_map(|(subscription, action)| {
                action
                    .describe(message)
                    .map(|descriptor| (*subscription, descriptor))
            })
            .collect()
    }

    /// Run the action registered under `subscription` against a message.
    pub async fn run_action(&self, subscription: Subscription, message: &Message) -> Result<()> {
        let action = self
            .registry()
            .actions
            .iter()
            .find(|(s, _)| *s == subscription)
            .map(|(_, action)| action.clone())
            .ok_or_else(|| anyhow!("No message action registered as {}", subscription))?;

        action.run(message).await
    }

    /// Live registrations of every kind.
    pub fn registration_count(&self) -> usize {
        let registry = self.registry();
        registry.handlers.len() + registry.pre_send.len() + registry.actions.len()
    }
}

impl EventBus for Dispatcher {
    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Subscription {
        let subscription = self.next_subscription();
        self.registry().handlers.push((subscription, kind, handler));
        subscription
    }

    fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut registry = self.registry();
        let before = registry.handlers.len();
        registry.handlers.retain(|(s, _, _)| *s != subscription);
        registry.handlers.len() != before
    }

    fn add_pre_send_listener(&self, listener: Arc<dyn PreSendListener>) -> Subscription {
        let subscription = self.next_subscription();
        self.registry().pre_send.push((subscription, listener));
        subscription
    }

    fn remove_pre_send_listener(&self, subscription: Subscription) -> bool {
        let mut registry = self.registry();
        let before = registry.pre_send.len();
        registry.pre_send.retain(|(s, _)| *s != subscription);
        registry.pre_send.len() != before
    }

    fn add_message_action(&self, action: Arc<dyn MessageAction>) -> Subscription {
        let subscription = self.next_subscription();
        self.registry().actions.push((subscription, action));
        subscription
    }

    fn remove_message_action(&self, subscription: Subscription) -> bool {
        let mut registry = self.registry();
        let before = registry.actions.len();
        registry.actions.retain(|(s, _)| *s != subscription);
        registry.actions.len() != before
    }
}
