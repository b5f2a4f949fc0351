//! Session-scoped translation cache keyed by message id.

use crate::message::Translation;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Write-once map from message id to its translation.
///
/// Entries are never overwritten or evicted; the cache lives exactly as long as
/// the orchestrator that owns it.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: RwLock<HashMap<String, Translation>>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Translation> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Store a translation unless the id already has one.
    ///
    /// Returns `false` when an entry existed; the stored value is left as is.
    pub fn set(&self, id: &str, translation: Translation) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(id) {
            return false;
        }
        entries.insert(id.to_string(), translation);
        true
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
