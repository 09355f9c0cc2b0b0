//! Shared test doubles for job and courier scenarios

use async_trait::async_trait;
use media_courier::channel::{Button, ChatId, MessageChannel, MessageId, UploadProgressFn};
use media_courier::{
    CollectionItem, Config, Error, ExtractorError, ExtractorErrorKind, MediaExtractor,
    MediaMetadata,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Everything a channel mock observed, in order
#[derive(Debug, Clone)]
pub enum Sent {
    Text(String),
    Menu(String, Vec<Vec<Button>>),
    Edit(MessageId, String),
    Delete(MessageId),
    File(PathBuf, String),
    Alert(String),
}

/// Message channel that records every call and invents message ids
pub struct RecordingChannel {
    pub sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    fail_edits: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::with_edit_failures(false)
    }

    /// Channel whose `edit_text` always fails, for edit-fault scenarios
    pub fn with_edit_failures(fail_edits: bool) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            fail_edits,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn uploaded_files(&self) -> Vec<PathBuf> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::File(p, _) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Alert(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    /// Callback payloads of the last menu sent
    pub fn last_menu_payloads(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|s| match s {
                Sent::Menu(_, rows) => Some(
                    rows.iter()
                        .flatten()
                        .map(|b| b.callback_data.clone())
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn send_text(&self, _chat: ChatId, text: &str) -> media_courier::Result<MessageId> {
        self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_menu(
        &self,
        _chat: ChatId,
        text: &str,
        buttons: Vec<Vec<Button>>,
    ) -> media_courier::Result<MessageId> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Menu(text.to_string(), buttons));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn edit_text(
        &self,
        _chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> media_courier::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Edit(message, text.to_string()));
        if self.fail_edits {
            return Err(Error::Channel("edit rejected".to_string()));
        }
        Ok(())
    }

    async fn delete_message(&self, _chat: ChatId, message: MessageId) -> media_courier::Result<()> {
        self.sent.lock().unwrap().push(Sent::Delete(message));
        Ok(())
    }

    async fn send_file(
        &self,
        _chat: ChatId,
        file: &Path,
        caption: &str,
        _thumbnail: Option<&Path>,
        progress: UploadProgressFn,
    ) -> media_courier::Result<()> {
        progress(0.5);
        progress(1.0);
        self.sent
            .lock()
            .unwrap()
            .push(Sent::File(file.to_path_buf(), caption.to_string()));
        Ok(())
    }

    async fn alert(&self, _callback_id: &str, text: &str) -> media_courier::Result<()> {
        self.sent.lock().unwrap().push(Sent::Alert(text.to_string()));
        Ok(())
    }
}

/// Extractor driven by simple URL conventions:
/// - metadata for a URL containing `bad` always fails
/// - the first metadata fetch per URL fails rate-limited when `flaky` is set
/// - downloads write a small artifact to the destination
/// - windows replay the configured item list once, then run dry
pub struct FakeExtractor {
    pub flaky_first_metadata: bool,
    pub collection: Vec<CollectionItem>,
    /// When set, downloads block until the lock can be taken
    pub download_gate: Option<std::sync::Arc<tokio::sync::Mutex<()>>>,
    metadata_calls: Mutex<Vec<String>>,
    windows_served: Mutex<u32>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self {
            flaky_first_metadata: false,
            collection: Vec::new(),
            download_gate: None,
            metadata_calls: Mutex::new(Vec::new()),
            windows_served: Mutex::new(0),
        }
    }

}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata, ExtractorError> {
        let prior = {
            let mut calls = self.metadata_calls.lock().unwrap();
            let prior = calls.iter().filter(|u| u.as_str() == url).count();
            calls.push(url.to_string());
            prior
        };

        if url.contains("bad") {
            return Err(ExtractorError::new(
                ExtractorErrorKind::Unavailable,
                "Video not found",
            ));
        }
        if self.flaky_first_metadata && prior == 0 {
            return Err(ExtractorError::new(
                ExtractorErrorKind::RateLimited,
                "Sign in to confirm you're not a bot",
            ));
        }

        Ok(MediaMetadata {
            title: "Ten Minute Mix".into(),
            duration_secs: 600,
            uploader: "Maker".into(),
            thumbnails: Vec::new(),
            source_url: url.to_string(),
        })
    }

    async fn download(
        &self,
        _url: &str,
        _format_selector: &str,
        dest: &Path,
    ) -> Result<(), ExtractorError> {
        if let Some(gate) = &self.download_gate {
            let _hold = gate.lock().await;
        }
        tokio::fs::write(dest, b"media bytes")
            .await
            .map_err(|e| ExtractorError::other(e.to_string()))?;
        Ok(())
    }

    async fn fetch_window(
        &self,
        _collection_url: &str,
        _start: u32,
        _end: u32,
    ) -> Result<Vec<CollectionItem>, ExtractorError> {
        let mut served = self.windows_served.lock().unwrap();
        *served += 1;
        if *served == 1 {
            Ok(self.collection.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn fetch_ids(&self, _collection_url: &str) -> Result<Vec<String>, ExtractorError> {
        Ok(self.collection.iter().map(|i| i.url.clone()).collect())
    }
}

/// Config with all delays shrunk so scenarios finish quickly
pub fn fast_config(temp_dir: &Path) -> Config {
    let mut config = Config::default();
    config.transfer.temp_dir = temp_dir.to_path_buf();
    config.metadata_retry.initial_delay = Duration::from_millis(5);
    config.pacing.collection_item_delay = Duration::from_millis(1);
    config.pacing.enumeration_page_delay = Duration::from_millis(1);
    config.pacing.download_poll_interval = Duration::from_millis(10);
    config
}
