//! Translation provider seam.

use crate::message::{Direction, Translation};
use anyhow::Result;
use async_trait::async_trait;

/// An external translation service.
///
/// Implementations pick the language pair from `direction`. Latency and failure
/// modes are up to the provider; callers treat any `Err` as "no translation".
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, direction: Direction, text: &str) -> Result<Translation>;
}
