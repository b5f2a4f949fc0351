//! Rendering seam: attaches a translation to a message in the UI.

use crate::message::Translation;

/// Shows a translation next to the message it belongs to.
///
/// Presenting is fire-and-forget; an implementation must not fail the pipeline.
pub trait Presenter: Send + Sync {
    fn present(&self, message_id: &str, translation: &Translation);
}
