//! Test doubles for the provider and presenter seams.

use crate::message::{Direction, Translation};
use crate::presenter::Presenter;
use crate::translator::Translator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Call {
    pub direction: Direction,
    pub text: String,
    pub at: Instant,
}

/// Scripted translator that records every call.
///
/// Unscripted texts translate to `"translated: <text>"` with source language "xx".
#[derive(Default)]
pub struct MockTranslator {
    responses: Mutex<HashMap<String, Result<Translation, String>>>,
    calls: Mutex<Vec<Call>>,
    delay: Duration,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn respond(self, text: &str, translation: Translation) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(text.to_string(), Ok(translation));
        self
    }

    pub fn fail(self, text: &str, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(text.to_string(), Err(message.to_string()));
        self
    }

    /// Replace the scripted reply for `text` after construction.
    pub fn set_response(&self, text: &str, translation: Translation) {
        self.responses
            .lock()
            .unwrap()
            .insert(text.to_string(), Ok(translation));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.text).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, direction: Direction, text: &str) -> Result<Translation> {
        self.calls.lock().unwrap().push(Call {
            direction,
            text: text.to_string(),
            at: Instant::now(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.responses.lock().unwrap().get(text).cloned();
        match scripted {
            Some(Ok(translation)) => Ok(translation),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(Translation::new("xx", format!("translated: {}", text))),
        }
    }
}

/// Presenter that remembers what it was asked to show.
#[derive(Default)]
pub struct RecordingPresenter {
    presented: Mutex<Vec<(String, Translation)>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> Vec<(String, Translation)> {
        self.presented.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.presented.lock().unwrap().len()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&self, message_id: &str, translation: &Translation) {
        self.presented
            .lock()
            .unwrap()
            .push((message_id.to_string(), translation.clone()));
    }
}
