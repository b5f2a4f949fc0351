//! Translation orchestration: cache lookups, provider calls, throttled batches
//! and outgoing body rewrites.

use crate::cache::TranslationCache;
use crate::message::{compose_outbound, Direction, Message};
use crate::metrics::TranslationMetrics;
use crate::presenter::Presenter;
use crate::translator::Translator;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause after each provider call inside a batch
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(60);

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Delay inserted after every batch item that reached the provider
    pub throttle: Duration,
    /// Keep empty provider results in the cache.
    ///
    /// When set, a message whose first translation came back empty is never
    /// asked again and later cache hits present the empty text. When unset,
    /// empty results are dropped and the next trigger asks the provider again.
    pub cache_empty_results: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            throttle: DEFAULT_THROTTLE,
            cache_empty_results: false,
        }
    }
}

/// What a single `translate_message` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the cache; no provider call
    CacheHit,
    /// The provider was called
    Translated,
    /// Nothing to translate; no provider call
    Skipped,
}

impl Outcome {
    pub fn hit_prior_cache(self) -> bool {
        matches!(self, Outcome::CacheHit)
    }
}

/// Tally of a `translate_all` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub translated: usize,
    pub cache_hits: usize,
    pub skipped: usize,
}

pub struct TranslationOrchestrator {
    translator: Arc<dyn Translator>,
    presenter: Arc<dyn Presenter>,
    cache: TranslationCache,
    metrics: TranslationMetrics,
    options: OrchestratorOptions,
}

impl TranslationOrchestrator {
    pub fn new(
        translator: Arc<dyn Translator>,
        presenter: Arc<dyn Presenter>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            translator,
            presenter,
            cache: TranslationCache::new(),
            metrics: TranslationMetrics::new(),
            options,
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        &self.metrics
    }

    /// Translate one incoming message, at most once per id.
    ///
    /// A cached id is presented again without touching the provider. Provider
    /// errors propagate and leave the cache untouched, so a later call retries.
    pub async fn translate_message(&self, message: &Message) -> Result<Outcome> {
        if let Some(cached) = self.cache.get(&message.id) {
            self.metrics.record_cache_hit();
            debug!("Cache hit for message {}", message.id);
            self.presenter.present(&message.id, &cached);
            return Ok(Outcome::CacheHit);
        }

        let Some(text) = message.text() else {
            debug!("Message {} has no content, skipping", message.id);
            return Ok(Outcome::Skipped);
        };

        self.metrics.record_cache_miss();
        self.metrics.record_api_call();

        let translation = match self.translator.translate(Direction::Incoming, text).await {
            Ok(translation) => translation,
            Err(e) => {
                self.metrics.record_api_failure();
                return Err(e.context(format!("Failed to translate message {}", message.id)));
            }
        };

        if translation.is_empty() {
            if self.options.cache_empty_results {
                self.cache.set(&message.id, translation);
            }
            warn!("Provider returned an empty translation for message {}", message.id);
            return Ok(Outcome::Translated);
        }

        let shown = if self.cache.set(&message.id, translation.clone()) {
            translation
        } else {
            // A concurrent call for the same id finished first; its entry stays
            debug!("Message {} was cached while translating", message.id);
            self.cache.get(&message.id).unwrap_or(translation)
        };
        self.presenter.present(&message.id, &shown);

        Ok(Outcome::Translated)
    }

    /// Translate messages one after another, oldest first.
    ///
    /// Sleeps for the configured throttle after every provider call; cache hits
    /// and skipped messages move on immediately. The first provider error stops
    /// the batch.
    pub async fn translate_all(&self, messages: &[Message]) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        info!("Translating batch of {} messages", messages.len());

        for message in messages {
            match self.translate_message(message).await? {
                Outcome::CacheHit => report.cache_hits += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Translated => {
                    report.translated += 1;
                    tokio::time::sleep(self.options.throttle).await;
                }
            }
        }

        info!(
            "Batch complete: {} translated, {} cached, {} skipped",
            report.translated, report.cache_hits, report.skipped
        );

        Ok(report)
    }

    /// Re-present cached translations for `messages`; never calls the provider.
    pub fn restore_cached(&self, messages: &[Message]) -> usize {
        let mut restored = 0;
        for message in messages {
            if let Some(cached) = self.cache.get(&message.id) {
                self.presenter.present(&message.id, &cached);
                restored += 1;
            }
        }

        self.metrics.record_restored(restored);
        debug!("Restored {} cached translations", restored);
        restored
    }

    /// Rewrite an outgoing message so it carries its translation.
    ///
    /// Returns `false` and leaves the message untouched when it has no content.
    /// On provider failure the content is left as is and the error propagates.
    pub async fn translate_outgoing(&self, message: &mut Message) -> Result<bool> {
        let Some(original) = message.text() else {
            return Ok(false);
        };

        self.metrics.record_api_call();
        let translation = match self.translator.translate(Direction::Outgoing, original).await {
            Ok(translation) => translation,
            Err(e) => {
                self.metrics.record_api_failure();
                return Err(e.context("Failed to translate outgoing message"));
            }
        };

        let body = compose_outbound(&translation.text, original);
        message.content = Some(body);
        self.metrics.record_outgoing_rewrite();

        Ok(true)
    }
}
