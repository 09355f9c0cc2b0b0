//! Message channel collaborator contract
//!
//! Transport-level delivery (Telegram, Matrix, ...) is out of scope for the
//! orchestrator; it talks to this trait only. Upload calls accept a progress
//! callback which the transport may invoke with either a fraction or an
//! absolute byte count — the job layer normalizes before rendering.

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Destination identifier on the message channel
pub type ChatId = i64;

/// Identifier of a previously sent message, used for edits and deletion
pub type MessageId = i64;

/// One interactive button in a menu row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    /// Visible label
    pub label: String,
    /// Opaque payload delivered back in the callback event
    pub callback_data: String,
}

impl Button {
    /// Create a button
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Callback invoked by the transport during a file upload.
///
/// The argument is whatever the transport reports: a fraction in (0, 1) or
/// an absolute byte count.
pub type UploadProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Abstract message channel used for all user-visible delivery
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send a plain text message, returning its id for later edits
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId>;

    /// Send a text message with interactive button rows
    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        buttons: Vec<Vec<Button>>,
    ) -> Result<MessageId>;

    /// Edit a previously sent text message
    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()>;

    /// Delete a previously sent message
    async fn delete_message(&self, chat: ChatId, message: MessageId) -> Result<()>;

    /// Upload a file with an optional thumbnail, reporting progress through
    /// the callback
    async fn send_file(
        &self,
        chat: ChatId,
        file: &Path,
        caption: &str,
        thumbnail: Option<&Path>,
        progress: UploadProgressFn,
    ) -> Result<()>;

    /// Show a transient alert in response to a button callback
    async fn alert(&self, callback_id: &str, text: &str) -> Result<()>;
}
