//! Integration tests for the chat translation pipeline
//!
//! These tests drive the pipeline end to end through the in-process
//! dispatcher: channel switches, live incoming messages, the outgoing
//! interceptor and the batch action, with a scripted provider.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use chat_translate::dispatcher::Dispatcher;
use chat_translate::events::ChatEvent;
use chat_translate::orchestrator::{OrchestratorOptions, DEFAULT_THROTTLE};
use chat_translate::pipeline::{TRANSLATE_ALL_LABEL, TRANSLATE_LABEL};
use chat_translate::presenter::Presenter;
use chat_translate::settings::{self, Settings};
use chat_translate::store::MemoryStore;
use chat_translate::translator::Translator;
use chat_translate::{
    Direction, EventPipeline, Message, Outcome, PipelineDeps, PipelineOptions, Translation,
    TranslationOrchestrator,
};

// ==================== Test Helpers ====================

#[derive(Default)]
struct ScriptedTranslator {
    replies: Mutex<HashMap<String, Translation>>,
    failures: Mutex<Vec<String>>,
    calls: Mutex<Vec<(Direction, String, Instant)>>,
    latency: Duration,
}

impl ScriptedTranslator {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    fn reply(self, text: &str, translation: Translation) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(text.to_string(), translation);
        self
    }

    fn failing(self, text: &str) -> Self {
        self.failures.lock().unwrap().push(text.to_string());
        self
    }

    fn texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text, _)| text.clone())
            .collect()
    }

    fn times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, _, at)| *at).collect()
    }

    fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, direction: Direction, text: &str) -> Result<Translation> {
        self.calls
            .lock()
            .unwrap()
            .push((direction, text.to_string(), Instant::now()));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failures.lock().unwrap().iter().any(|t| t == text) {
            return Err(anyhow!("provider unavailable"));
        }

        let reply = self.replies.lock().unwrap().get(text).cloned();
        Ok(reply.unwrap_or_else(|| Translation::new("xx", text.to_uppercase())))
    }
}

#[derive(Default)]
struct Screen {
    shown: Mutex<Vec<(String, Translation)>>,
}

impl Screen {
    fn shown(&self) -> Vec<(String, Translation)> {
        self.shown.lock().unwrap().clone()
    }
}

impl Presenter for Screen {
    fn present(&self, message_id: &str, translation: &Translation) {
        self.shown
            .lock()
            .unwrap()
            .push((message_id.to_string(), translation.clone()));
    }
}

struct Harness {
    bus: Arc<Dispatcher>,
    store: Arc<MemoryStore>,
    translator: Arc<ScriptedTranslator>,
    screen: Arc<Screen>,
    settings: watch::Sender<Settings>,
    pipeline: EventPipeline,
}

fn harness(translator: ScriptedTranslator, settings: Settings) -> Harness {
    let bus = Arc::new(Dispatcher::new());
    let store = Arc::new(MemoryStore::new());
    let translator = Arc::new(translator);
    let screen = Arc::new(Screen::default());
    let (settings_tx, settings_rx) = settings::channel(settings);

    let pipeline = EventPipeline::new(
        PipelineDeps {
            bus: bus.clone(),
            store: store.clone(),
            translator: translator.clone(),
            presenter: screen.clone(),
            settings: settings_rx,
        },
        PipelineOptions::default(),
    );
    pipeline.start().expect("pipeline should start");

    Harness {
        bus,
        store,
        translator,
        screen,
        settings: settings_tx,
        pipeline,
    }
}

fn live() -> Settings {
    Settings {
        auto_translate_live_chat: true,
        auto_translate_outgoing: true,
        ..Settings::default()
    }
}

fn select(channel_id: &str) -> ChatEvent {
    ChatEvent::ChannelSelect {
        channel_id: channel_id.to_string(),
    }
}

fn incoming(message: &Message) -> ChatEvent {
    ChatEvent::MessageCreate {
        channel_id: message.channel_id.clone(),
        message: message.clone(),
    }
}

// ==================== Orchestrator Scenarios ====================

#[tokio::test]
async fn test_scenario_first_translation_then_cache_hit() {
    let translator = Arc::new(
        ScriptedTranslator::default().reply("bonjour", Translation::new("fr", "hello")),
    );
    let screen = Arc::new(Screen::default());
    let orchestrator = TranslationOrchestrator::new(
        translator.clone(),
        screen.clone(),
        OrchestratorOptions::default(),
    );
    let message = Message::new("1", "general", "bonjour");

    let first = orchestrator.translate_message(&message).await.unwrap();
    assert!(!first.hit_prior_cache());
    assert_eq!(orchestrator.cache().get("1"), Some(Translation::new("fr", "hello")));
    assert_eq!(
        screen.shown(),
        vec![("1".to_string(), Translation::new("fr", "hello"))]
    );

    let second = orchestrator.translate_message(&message).await.unwrap();
    assert_eq!(second, Outcome::CacheHit);
    assert_eq!(translator.count(), 1);
    assert_eq!(screen.shown().len(), 2);
    assert_eq!(screen.shown()[1], screen.shown()[0]);
}

#[tokio::test]
async fn test_scenario_batch_is_throttled_between_calls() {
    let translator = Arc::new(ScriptedTranslator::default());
    let orchestrator = TranslationOrchestrator::new(
        translator.clone(),
        Arc::new(Screen::default()),
        OrchestratorOptions::default(),
    );

    let messages = vec![
        Message::new("a", "general", "a"),
        Message::new("b", "general", "b"),
        Message::new("c", "general", "c"),
    ];

    let started = Instant::now();
    let report = orchestrator.translate_all(&messages).await.unwrap();

    assert_eq!(report.translated, 3);
    assert_eq!(translator.texts(), vec!["a", "b", "c"]);
    let times = translator.times();
    assert!(times[1].duration_since(times[0]) >= DEFAULT_THROTTLE);
    assert!(times[2].duration_since(times[1]) >= DEFAULT_THROTTLE);
    assert!(started.elapsed() >= DEFAULT_THROTTLE * 2);
}

#[tokio::test]
async fn test_restore_never_calls_provider() {
    let translator = Arc::new(ScriptedTranslator::default());
    let orchestrator = TranslationOrchestrator::new(
        translator.clone(),
        Arc::new(Screen::default()),
        OrchestratorOptions::default(),
    );
    let messages: Vec<_> = (0..20)
        .map(|i| Message::new(i.to_string(), "general", format!("message {}", i)))
        .collect();

    assert_eq!(orchestrator.restore_cached(&messages), 0);
    orchestrator.translate_message(&messages[3]).await.unwrap();
    assert_eq!(orchestrator.restore_cached(&messages), 1);

    assert_eq!(translator.count(), 1);
}

// ==================== Pipeline Scenarios ====================

#[tokio::test]
async fn test_scenario_outgoing_body_is_rewritten() {
    let h = harness(
        ScriptedTranslator::default().reply("hi", Translation::new("en", "salut")),
        live(),
    );

    let sent = h.bus.send(Message::new("1", "general", "hi")).await.unwrap();

    assert_eq!(sent.content.as_deref(), Some("\nsalut\n|>> hi\n"));
}

#[tokio::test]
async fn test_outgoing_rewrite_gated_by_setting_and_content() {
    let h = harness(ScriptedTranslator::default(), Settings::default());

    let untouched = h.bus.send(Message::new("1", "general", "hi")).await.unwrap();
    assert_eq!(untouched.content.as_deref(), Some("hi"));

    h.settings.send_modify(|s| s.auto_translate_outgoing = true);
    let empty = h.bus.send(Message::new("2", "general", "")).await.unwrap();
    assert_eq!(empty.content.as_deref(), Some(""));

    assert_eq!(h.translator.count(), 0);
}

#[tokio::test]
async fn test_outgoing_provider_failure_blocks_send() {
    let h = harness(ScriptedTranslator::default().failing("hi"), live());

    let result = h.bus.send(Message::new("1", "general", "hi")).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_scenario_marker_suppresses_incoming_translation() {
    let h = harness(ScriptedTranslator::default(), live());
    h.bus.dispatch_and_wait(select("general")).await;

    let echoed = Message::new("1", "general", "\nsalut\n|>> hi\n");
    h.bus.dispatch_and_wait(incoming(&echoed)).await;

    assert_eq!(h.translator.count(), 0);
    assert!(h.screen.shown().is_empty());
}

#[tokio::test]
async fn test_own_sent_message_is_not_retranslated_on_echo() {
    let h = harness(
        ScriptedTranslator::default().reply("hi", Translation::new("en", "salut")),
        live(),
    );
    h.bus.dispatch_and_wait(select("general")).await;

    let sent = h.bus.send(Message::new("1", "general", "hi")).await.unwrap();
    h.bus.dispatch_and_wait(incoming(&sent)).await;

    // Only the outgoing call
    assert_eq!(h.translator.count(), 1);
}

#[tokio::test]
async fn test_revisiting_channel_restores_without_provider_calls() {
    let h = harness(ScriptedTranslator::default(), live());
    let first = Message::new("1", "general", "hola");
    let second = Message::new("2", "general", "adios");
    h.store.push(first.clone());
    h.store.push(second.clone());

    h.bus.dispatch_and_wait(select("general")).await;
    h.bus.dispatch_and_wait(incoming(&first)).await;
    h.bus.dispatch_and_wait(incoming(&second)).await;
    assert_eq!(h.translator.count(), 2);

    h.bus.dispatch_and_wait(select("random")).await;
    h.bus.dispatch_and_wait(select("general")).await;

    assert_eq!(h.translator.count(), 2);
    let shown: Vec<_> = h.screen.shown().into_iter().map(|(id, _)| id).collect();
    // Live translations, then the restore (newest first, as the store returns them)
    assert_eq!(shown, vec!["1", "2", "2", "1"]);
}

#[tokio::test]
async fn test_translate_all_action_after_reversal() {
    let h = harness(ScriptedTranslator::default(), Settings::default());
    for (id, text) in [("m1", "one"), ("m2", "two"), ("m3", "three")] {
        h.store.push(Message::new(id, "general", text));
    }

    let latest = Message::new("m3", "general", "three");
    let (action, _) = h
        .bus
        .actions_for(&latest)
        .into_iter()
        .find(|(_, d)| d.label == TRANSLATE_ALL_LABEL)
        .expect("translate-all action registered");
    h.bus.run_action(action, &latest).await.unwrap();

    assert_eq!(h.translator.texts(), vec!["one", "two", "three"]);
    assert_eq!(h.pipeline.cached_translations(), 3);
}

#[tokio::test]
async fn test_translate_action_after_failure_retries() {
    let h = harness(ScriptedTranslator::default().failing("hola"), Settings::default());
    let message = Message::new("1", "general", "hola");
    let (action, _) = h
        .bus
        .actions_for(&message)
        .into_iter()
        .find(|(_, d)| d.label == TRANSLATE_LABEL)
        .expect("translate action registered");

    assert!(h.bus.run_action(action, &message).await.is_err());
    assert!(h.bus.run_action(action, &message).await.is_err());

    // No entry was written, so each trigger reached the provider
    assert_eq!(h.translator.count(), 2);
    assert_eq!(h.pipeline.cached_translations(), 0);
    assert_eq!(h.pipeline.metrics().unwrap().api_failures, 2);
}

// ==================== Concurrency Properties ====================

#[tokio::test]
async fn test_concurrent_events_for_same_message_may_both_call_provider() {
    let h = harness(
        ScriptedTranslator::with_latency(Duration::from_millis(50)),
        live(),
    );
    h.bus.dispatch_and_wait(select("general")).await;
    let message = Message::new("1", "general", "hola");

    // Both handlers observe an empty cache before either finishes
    let mut tasks = h.bus.dispatch(incoming(&message));
    tasks.extend(h.bus.dispatch(incoming(&message)));
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(h.translator.count(), 2);
    assert_eq!(h.pipeline.cached_translations(), 1);
}

#[tokio::test]
async fn test_batch_survives_stop() {
    let h = harness(
        ScriptedTranslator::with_latency(Duration::from_millis(10)),
        Settings::default(),
    );
    for i in 0..3 {
        h.store
            .push(Message::new(i.to_string(), "general", format!("text {}", i)));
    }
    let latest = Message::new("2", "general", "text 2");
    let (action, _) = h
        .bus
        .actions_for(&latest)
        .into_iter()
        .find(|(_, d)| d.label == TRANSLATE_ALL_LABEL)
        .unwrap();

    let bus = h.bus.clone();
    let batch = tokio::spawn(async move { bus.run_action(action, &latest).await });
    tokio::time::sleep(Duration::from_millis(5)).await;
    h.pipeline.stop().unwrap();

    batch.await.unwrap().unwrap();
    assert_eq!(h.translator.count(), 3);
    assert_eq!(h.screen.shown().len(), 3);
    assert_eq!(h.bus.registration_count(), 0);
}
