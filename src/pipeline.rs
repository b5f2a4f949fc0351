//! Event pipeline: wires a translation session into the host's event bus.
//!
//! The pipeline is either stopped or running. Starting creates a fresh session
//! (orchestrator, empty cache, current channel) and registers every handler;
//! stopping hands each registration back and drops the pipeline's hold on the
//! session. Work already in flight keeps its own reference and runs to completion.

use crate::error::PipelineError;
use crate::events::{
    ActionDescriptor, ChatEvent, EventBus, EventHandler, EventKind, MessageAction,
    PreSendListener, Subscription,
};
use crate::message::Message;
use crate::metrics::MetricsReport;
use crate::orchestrator::{OrchestratorOptions, TranslationOrchestrator};
use crate::presenter::Presenter;
use crate::settings::SettingsHandle;
use crate::store::MessageStore;
use crate::translator::Translator;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub orchestrator: OrchestratorOptions,
    /// Channel treated as active before the first channel switch
    pub initial_channel: Option<String>,
}

/// Collaborators the pipeline is built from.
#[derive(Clone)]
pub struct PipelineDeps {
    pub bus: Arc<dyn EventBus>,
    pub store: Arc<dyn MessageStore>,
    pub translator: Arc<dyn Translator>,
    pub presenter: Arc<dyn Presenter>,
    pub settings: SettingsHandle,
}

/// State owned by one running period of the pipeline.
pub struct Session {
    orchestrator: TranslationOrchestrator,
    current_channel: Mutex<Option<String>>,
    store: Arc<dyn MessageStore>,
    settings: SettingsHandle,
}

impl Session {
    pub fn orchestrator(&self) -> &TranslationOrchestrator {
        &self.orchestrator
    }

    pub fn current_channel(&self) -> Option<String> {
        self.current_channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current_channel(&self, channel_id: &str) {
        *self
            .current_channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(channel_id.to_string());
    }

    fn on_channel_select(&self, channel_id: &str) {
        self.set_current_channel(channel_id);
        let messages = self.store.get_messages(channel_id);
        let restored = self.orchestrator.restore_cached(&messages);
        debug!(
            "Switched to channel {}, restored {}/{} translations",
            channel_id,
            restored,
            messages.len()
        );
    }

    async fn on_message_create(&self, channel_id: &str, message: &Message) -> Result<()> {
        if !self.settings.borrow().auto_translate_live_chat {
            return Ok(());
        }
        if message.carries_translation() {
            debug!("Message {} already carries a translation", message.id);
            return Ok(());
        }
        if self.current_channel().as_deref() != Some(channel_id) {
            return Ok(());
        }

        self.orchestrator.translate_message(message).await?;
        Ok(())
    }

    async fn on_before_send(&self, message: &mut Message) -> Result<()> {
        if !self.settings.borrow().auto_translate_outgoing {
            return Ok(());
        }
        if message.text().is_none() {
            return Ok(());
        }

        self.orchestrator.translate_outgoing(message).await?;
        Ok(())
    }

    /// Translate a channel's whole history, oldest first.
    async fn translate_channel(&self, channel_id: &str) -> Result<()> {
        let mut messages = self.store.get_messages(channel_id);
        messages.reverse();
        self.orchestrator.translate_all(&messages).await?;
        Ok(())
    }

    fn describe_action(&self, label: &str, message: &Message) -> Option<ActionDescriptor> {
        message.text()?;
        Some(ActionDescriptor {
            label: label.to_string(),
            channel: self.store.get_channel(&message.channel_id),
        })
    }
}

// ==================== Registered Handlers ====================

struct ChannelSelectHandler(Arc<Session>);

#[async_trait]
impl EventHandler for ChannelSelectHandler {
    async fn handle(&self, event: &ChatEvent) -> Result<()> {
        if let ChatEvent::ChannelSelect { channel_id } = event {
            self.0.on_channel_select(channel_id);
        }
        Ok(())
    }
}

struct MessageCreateHandler(Arc<Session>);

#[async_trait]
impl EventHandler for MessageCreateHandler {
    async fn handle(&self, event: &ChatEvent) -> Result<()> {
        match event {
            ChatEvent::MessageCreate {
                channel_id,
                message,
            } => self.0.on_message_create(channel_id, message).await,
            _ => Ok(()),
        }
    }
}

struct OutgoingInterceptor(Arc<Session>);

#[async_trait]
impl PreSendListener for OutgoingInterceptor {
    async fn before_send(&self, message: &mut Message) -> Result<()> {
        self.0.on_before_send(message).await
    }
}

/// "Translate": translate one message on request, served from cache when possible.
struct TranslateAction(Arc<Session>);

#[async_trait]
impl MessageAction for TranslateAction {
    fn describe(&self, message: &Message) -> Option<ActionDescriptor> {
        self.0.describe_action(TRANSLATE_LABEL, message)
    }

    async fn run(&self, message: &Message) -> Result<()> {
        self.0.orchestrator.translate_message(message).await?;
        Ok(())
    }
}

/// "Translate All Messages": batch-translate the message's channel.
struct TranslateAllAction(Arc<Session>);

#[async_trait]
impl MessageAction for TranslateAllAction {
    fn describe(&self, message: &Message) -> Option<ActionDescriptor> {
        self.0.describe_action(TRANSLATE_ALL_LABEL, message)
    }

    async fn run(&self, message: &Message) -> Result<()> {
        self.0.translate_channel(&message.channel_id).await
    }
}

pub const TRANSLATE_LABEL: &str = "Translate";
pub const TRANSLATE_ALL_LABEL: &str = "Translate All Messages";

// ==================== Lifecycle ====================

#[derive(Debug, Clone, Copy)]
enum Registration {
    Event(Subscription),
    PreSend(Subscription),
    Action(Subscription),
}

struct Running {
    session: Arc<Session>,
    registrations: Vec<Registration>,
}

pub struct EventPipeline {
    deps: PipelineDeps,
    options: PipelineOptions,
    running: Mutex<Option<Running>>,
}

impl EventPipeline {
    pub fn new(deps: PipelineDeps, options: PipelineOptions) -> Self {
        Self {
            deps,
            options,
            running: Mutex::new(None),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stopped → Running.
    pub fn start(&self) -> Result<(), PipelineError> {
        let mut state = self.state();
        if state.is_some() {
            return Err(PipelineError::AlreadyRunning);
        }

        let session = Arc::new(Session {
            orchestrator: TranslationOrchestrator::new(
                self.deps.translator.clone(),
                self.deps.presenter.clone(),
                self.options.orchestrator.clone(),
            ),
            current_channel: Mutex::new(self.options.initial_channel.clone()),
            store: self.deps.store.clone(),
            settings: self.deps.settings.clone(),
        });

        let bus = &self.deps.bus;
        let registrations = vec![
            Registration::Event(bus.subscribe(
                EventKind::ChannelSelect,
                Arc::new(ChannelSelectHandler(session.clone())),
            )),
            Registration::Event(bus.subscribe(
                EventKind::MessageCreate,
                Arc::new(MessageCreateHandler(session.clone())),
            )),
            Registration::PreSend(
                bus.add_pre_send_listener(Arc::new(OutgoingInterceptor(session.clone()))),
            ),
            Registration::Action(
                bus.add_message_action(Arc::new(TranslateAction(session.clone()))),
            ),
            Registration::Action(
                bus.add_message_action(Arc::new(TranslateAllAction(session.clone()))),
            ),
        ];

        info!("Translation pipeline started with {} registrations", registrations.len());
        *state = Some(Running {
            session,
            registrations,
        });
        Ok(())
    }

    /// Running → Stopped. Every registration made by `start` is released.
    pub fn stop(&self) -> Result<(), PipelineError> {
        let running = self.state().take().ok_or(PipelineError::NotRunning)?;
        self.release(running);
        Ok(())
    }

    fn release(&self, running: Running) {
        let bus = &self.deps.bus;
        for registration in running.registrations {
            let removed = match registration {
                Registration::Event(s) => bus.unsubscribe(s),
                Registration::PreSend(s) => bus.remove_pre_send_listener(s),
                Registration::Action(s) => bus.remove_message_action(s),
            };
            if !removed {
                warn!("Registration {:?} was already gone from the bus", registration);
            }
        }

        info!(
            "Translation pipeline stopped ({} cached translations discarded)",
            running.session.orchestrator.cache().len()
        );
    }

    pub fn is_running(&self) -> bool {
        self.state().is_some()
    }

    /// The active session, if running.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.state().as_ref().map(|running| running.session.clone())
    }

    pub fn current_channel(&self) -> Option<String> {
        self.session().and_then(|session| session.current_channel())
    }

    pub fn metrics(&self) -> Option<MetricsReport> {
        self.session()
            .map(|session| session.orchestrator.metrics().report())
    }

    pub fn cached_translations(&self) -> usize {
        self.session()
            .map(|session| session.orchestrator.cache().len())
            .unwrap_or(0)
    }
}

impl Drop for EventPipeline {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = running {
            self.release(running);
        }
    }
}
