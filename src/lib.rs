//! In-flight chat translation: a per-message translation cache, an event
//! pipeline bound to the host chat client, and a throttled batch translator.

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod message;
pub mod metrics;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod presenter;
pub mod retry;
pub mod settings;
pub mod store;
pub mod translator;

#[cfg(test)]
mod testing;

pub use error::{PipelineError, ProviderError};
pub use message::{Direction, Message, Translation, OUTBOUND_MARKER};
pub use orchestrator::{Outcome, TranslationOrchestrator};
pub use pipeline::{EventPipeline, PipelineDeps, PipelineOptions};
