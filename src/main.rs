//! Console chat session with live translation.
//!
//! Usage:
//!   cargo run                     # Start a session in #general
//!
//! Commands:
//!   /join <channel>   switch channel (restores cached translations)
//!   /send <text>      send a message through the outgoing interceptor
//!   /all              translate the whole channel history
//!   /stats            print session metrics as JSON
//!   /quit             stop the pipeline and exit
//!   anything else     an incoming message in the current channel
//!
//! Required environment variables:
//! - OPENAI_API_KEY
//!
//! Optional:
//! - OPENAI_MODEL, OPENAI_API_URL
//! - AUTO_TRANSLATE_OUTGOING, AUTO_TRANSLATE_LIVE_CHAT
//! - RECEIVED_INPUT, RECEIVED_OUTPUT, SENT_INPUT, SENT_OUTPUT
//! - TRANSLATE_THROTTLE_MS, TRANSLATE_CACHE_EMPTY, TRANSLATE_MAX_ATTEMPTS

use anyhow::{Context, Result};
use chat_translate::config::Config;
use chat_translate::dispatcher::Dispatcher;
use chat_translate::events::ChatEvent;
use chat_translate::openai::OpenAiTranslator;
use chat_translate::orchestrator::OrchestratorOptions;
use chat_translate::pipeline::{EventPipeline, PipelineDeps, PipelineOptions, TRANSLATE_ALL_LABEL};
use chat_translate::presenter::Presenter;
use chat_translate::settings;
use chat_translate::store::{MemoryStore, MessageStore};
use chat_translate::{Message, Translation};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Prints translations under the message they belong to
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn present(&self, message_id: &str, translation: &Translation) {
        println!(
            "    ↳ #{} [{}] {}",
            message_id, translation.source_language, translation.text
        );
    }
}

struct Console {
    bus: Arc<Dispatcher>,
    store: Arc<MemoryStore>,
    channel: String,
    next_id: AtomicU64,
}

impl Console {
    fn next_message(&self, text: &str) -> Message {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Message::new(id.to_string(), self.channel.clone(), text)
    }

    async fn join(&mut self, channel: &str) {
        self.channel = channel.to_string();
        self.store.add_channel(channel, channel);
        println!("-- now in #{}", channel);
        self.bus
            .dispatch_and_wait(ChatEvent::ChannelSelect {
                channel_id: channel.to_string(),
            })
            .await;
    }

    async fn send(&self, text: &str) -> Result<()> {
        let sent = self.bus.send(self.next_message(text)).await?;
        println!("you: {}", sent.content.as_deref().unwrap_or_default().trim());
        self.store.push(sent.clone());

        // Our own message comes back like any other; the marker keeps it from
        // being translated a second time
        self.bus.dispatch(ChatEvent::MessageCreate {
            channel_id: self.channel.clone(),
            message: sent,
        });
        Ok(())
    }

    fn receive(&self, text: &str) {
        let message = self.next_message(text);
        println!("#{} them: {}", message.id, text);
        self.store.push(message.clone());
        self.bus.dispatch(ChatEvent::MessageCreate {
            channel_id: self.channel.clone(),
            message,
        });
    }

    async fn translate_all(&self) -> Result<()> {
        let Some(latest) = self.store.get_messages(&self.channel).into_iter().next() else {
            println!("-- #{} has no messages", self.channel);
            return Ok(());
        };

        let action = self
            .bus
            .actions_for(&latest)
            .into_iter()
            .find(|(_, descriptor)| descriptor.label == TRANSLATE_ALL_LABEL)
            .map(|(subscription, _)| subscription)
            .context("Translate-all action is not registered")?;

        self.bus.run_action(action, &latest).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_translate=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let (_settings_tx, settings_rx) = settings::channel(config.settings.clone());

    let bus = Arc::new(Dispatcher::new());
    let store = Arc::new(MemoryStore::new());
    let translator = Arc::new(OpenAiTranslator::new(&config, settings_rx.clone()));

    let pipeline = EventPipeline::new(
        PipelineDeps {
            bus: bus.clone(),
            store: store.clone(),
            translator,
            presenter: Arc::new(ConsolePresenter),
            settings: settings_rx,
        },
        PipelineOptions {
            orchestrator: OrchestratorOptions {
                throttle: config.throttle,
                cache_empty_results: config.cache_empty_results,
            },
            initial_channel: None,
        },
    );
    pipeline.start()?;

    info!(
        "Live translation {}, outgoing translation {}",
        if config.settings.auto_translate_live_chat { "on" } else { "off" },
        if config.settings.auto_translate_outgoing { "on" } else { "off" },
    );

    let mut console = Console {
        bus,
        store,
        channel: String::new(),
        next_id: AtomicU64::new(0),
    };
    console.join("general").await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        let result = match command {
            "/quit" => break,
            "/join" if !arg.is_empty() => {
                console.join(arg).await;
                Ok(())
            }
            "/send" if !arg.is_empty() => console.send(arg).await,
            "/all" => console.translate_all().await,
            "/stats" => {
                if let Some(report) = pipeline.metrics() {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                Ok(())
            }
            _ if line.starts_with('/') => {
                println!("-- unknown command: {}", line);
                Ok(())
            }
            _ => {
                console.receive(line);
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("{:#}", e);
        }
    }

    pipeline.stop()?;
    Ok(())
}
