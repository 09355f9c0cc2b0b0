//! Courier facade: inbound request handling and job dispatch
//!
//! Owns the process-scoped state (session cache, per-requester job guard)
//! and the collaborator seams, and translates inbound text commands and
//! button callbacks into single-item or collection jobs. State objects are
//! created at startup and torn down at shutdown; nothing is ambient.

use crate::cache::{SessionCache, session_token};
use crate::channel::{Button, ChatId, MessageChannel};
use crate::config::Config;
use crate::enumerate::PaginatedEnumerator;
use crate::error::{Error, Result};
use crate::extractor::MediaExtractor;
use crate::guard::ActiveJobs;
use crate::job::{CollectionJob, JobContext, SingleItemJob};
use crate::retry::retry_with_backoff;
use crate::transcoder::Transcoder;
use crate::types::{CollectionSession, MediaMetadata, MediaReference, Quality};
use std::sync::{Arc, Mutex};

const HELP_TEXT: &str = "Send me a media link and pick a quality.\n\
    Playlist links are downloaded item by item.\n\
    Commands:\n\
    /start — this message\n\
    /help — this message";

/// Cached payload a quality button resolves against
#[derive(Clone)]
enum SessionPayload {
    Single(MediaMetadata),
    Collection(CollectionSession),
}

/// What a callback token targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    /// One media item
    Single,
    /// A cached collection session
    Collection,
}

/// Decoded button-callback payload: `kind:quality:token`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackData {
    /// Single or collection target
    pub kind: TargetKind,
    /// Chosen quality
    pub quality: Quality,
    /// Session cache key
    pub token: String,
}

impl CallbackData {
    /// Encode into the delimited opaque token carried by a button
    pub fn encode(&self) -> String {
        let kind = match self.kind {
            TargetKind::Single => "s",
            TargetKind::Collection => "c",
        };
        format!("{kind}:{}:{}", self.quality.as_token(), self.token)
    }

    /// Decode a callback payload; malformed input is an invalid request
    pub fn decode(raw: &str) -> Result<Self> {
        let mut parts = raw.splitn(3, ':');
        let kind = match parts.next() {
            Some("s") => TargetKind::Single,
            Some("c") => TargetKind::Collection,
            _ => return Err(Error::InvalidRequest(format!("bad callback kind: {raw}"))),
        };
        let quality = parts
            .next()
            .and_then(Quality::from_token)
            .ok_or_else(|| Error::InvalidRequest(format!("bad callback quality: {raw}")))?;
        let token = parts
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidRequest(format!("bad callback token: {raw}")))?
            .to_string();

        Ok(Self {
            kind,
            quality,
            token,
        })
    }
}

/// The orchestrator: one instance per process, injected everywhere
pub struct Courier {
    ctx: JobContext,
    sessions: SessionCache<SessionPayload>,
    active: ActiveJobs,
    enumerator: PaginatedEnumerator,
    sweeper: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Courier {
    /// Wire up the courier from its collaborators and config, spawning the
    /// cache sweep task
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        transcoder: Arc<dyn Transcoder>,
        channel: Arc<dyn MessageChannel>,
        config: Arc<Config>,
    ) -> Self {
        let sessions = SessionCache::new(config.cache.session_ttl);
        let sweeper = sessions.spawn_sweeper(config.cache.sweep_interval);
        let enumerator = PaginatedEnumerator::new(
            Arc::clone(&extractor),
            config.api.window_size,
            config.pacing.enumeration_page_delay,
        );

        Self {
            ctx: JobContext {
                extractor,
                transcoder,
                channel,
                config,
            },
            sessions,
            active: ActiveJobs::new(),
            enumerator,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Handle an inbound text message: commands, or a source URL that opens
    /// a quality-selection session
    pub async fn handle_text(&self, chat: ChatId, text: &str) -> Result<()> {
        let text = text.trim();

        if text == "/start" || text == "/help" {
            self.ctx.channel.send_text(chat, HELP_TEXT).await?;
            return Ok(());
        }

        if !text.starts_with("http://") && !text.starts_with("https://") {
            self.ctx
                .channel
                .send_text(chat, "Send a media link, or /help for usage.")
                .await?;
            return Ok(());
        }

        let reference = MediaReference::parse(text);
        let result = if reference.is_collection() {
            self.open_collection_session(chat, &reference).await
        } else {
            self.open_single_session(chat, &reference).await
        };

        if let Err(e) = &result {
            tracing::error!(url = %reference.source_url, error = %e, "Session open failed");
            self.ctx.channel.send_text(chat, &e.user_message()).await?;
        }
        result
    }

    /// Handle a quality-button callback: resolve the session, enforce the
    /// single-flight guard, and run the job
    pub async fn handle_callback(
        &self,
        chat: ChatId,
        requester: &str,
        callback_id: &str,
        data: &str,
    ) -> Result<()> {
        let callback = match CallbackData::decode(data) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(data, error = %e, "Unparseable callback payload");
                self.alert(callback_id, &Error::SessionExpired.user_message())
                    .await;
                return Err(e);
            }
        };

        // Pre-flight rejection, not a job failure: the new request is
        // dropped, never queued. Checked before the session is touched so a
        // busy requester keeps the selection for a later press.
        let Some(_slot) = self.active.try_acquire(requester) else {
            self.alert(
                callback_id,
                &Error::AlreadyRunning(requester.to_string()).user_message(),
            )
            .await;
            return Err(Error::AlreadyRunning(requester.to_string()));
        };

        // One-shot consume: a repeated press of the same button misses
        let Some(payload) = self.sessions.take(&callback.token) else {
            self.alert(callback_id, &Error::SessionExpired.user_message())
                .await;
            return Err(Error::SessionExpired);
        };

        match (callback.kind, payload) {
            (TargetKind::Single, SessionPayload::Single(metadata)) => {
                let job = SingleItemJob::new(self.ctx.clone(), chat, callback.quality);
                job.run(&metadata.source_url).await?;
            }
            (TargetKind::Collection, SessionPayload::Collection(session)) => {
                let job = CollectionJob::new(self.ctx.clone(), chat, callback.quality);
                job.run(&session).await?;
            }
            _ => {
                // Token resolved to the other payload flavor; the session is
                // already consumed, so treat it as expired
                self.alert(callback_id, &Error::SessionExpired.user_message())
                    .await;
                return Err(Error::SessionExpired);
            }
        }

        Ok(())
    }

    /// Number of jobs currently in flight across all requesters
    pub fn active_jobs(&self) -> usize {
        self.active.active_count()
    }

    /// Stop background work and purge temp artifacts, best-effort
    pub async fn shutdown(&self) {
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }

        let temp_dir = &self.ctx.config.transfer.temp_dir;
        match tokio::fs::read_dir(temp_dir).await {
            Ok(mut entries) => {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                        tracing::debug!(path = %entry.path().display(), error = %e, "Shutdown purge skip");
                    }
                }
                tracing::info!(dir = %temp_dir.display(), "Purged temp artifacts");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, "Could not purge temp directory"),
        }
    }

    async fn open_single_session(&self, chat: ChatId, reference: &MediaReference) -> Result<()> {
        let extractor = Arc::clone(&self.ctx.extractor);
        let url = reference.source_url.clone();
        let metadata = retry_with_backoff(
            &self.ctx.config.metadata_retry,
            "fetch_metadata",
            move || {
                let extractor = Arc::clone(&extractor);
                let url = url.clone();
                async move { extractor.fetch_metadata(&url).await }
            },
        )
        .await
        .map_err(Error::Extractor)?;

        let token = session_token();
        let prompt = format!(
            "{}\n{} · {}\nPick a quality:",
            metadata.title,
            metadata.uploader,
            metadata.format_duration(),
        );
        self.sessions
            .insert(token.clone(), SessionPayload::Single(metadata));

        self.ctx
            .channel
            .send_menu(chat, &prompt, quality_menu(TargetKind::Single, &token))
            .await?;
        Ok(())
    }

    async fn open_collection_session(
        &self,
        chat: ChatId,
        reference: &MediaReference,
    ) -> Result<()> {
        let status = self
            .ctx
            .channel
            .send_text(chat, "Listing collection items...")
            .await?;

        let items = self
            .enumerator
            .enumerate(&reference.source_url)
            .await
            .map_err(Error::Extractor)?;

        if let Err(e) = self.ctx.channel.delete_message(chat, status).await {
            tracing::debug!(error = %e, "Could not delete listing status message");
        }

        if items.is_empty() {
            self.ctx
                .channel
                .send_text(chat, "That collection has no items.")
                .await?;
            return Ok(());
        }

        let token = session_token();
        let prompt = format!("{} items found.\nPick a quality for the batch:", items.len());
        self.sessions.insert(
            token.clone(),
            SessionPayload::Collection(CollectionSession {
                items,
                request_id: token.clone(),
            }),
        );

        self.ctx
            .channel
            .send_menu(chat, &prompt, quality_menu(TargetKind::Collection, &token))
            .await?;
        Ok(())
    }

    async fn alert(&self, callback_id: &str, text: &str) {
        if let Err(e) = self.ctx.channel.alert(callback_id, text).await {
            tracing::warn!(error = %e, "Callback alert failed");
        }
    }
}

/// Build the quality-selection button rows for a session
fn quality_menu(kind: TargetKind, token: &str) -> Vec<Vec<Button>> {
    let button = |quality: Quality| {
        Button::new(
            quality.label(),
            CallbackData {
                kind,
                quality,
                token: token.to_string(),
            }
            .encode(),
        )
    };

    vec![
        vec![button(Quality::AudioOnly)],
        vec![button(Quality::P360), button(Quality::P480)],
        vec![button(Quality::P720), button(Quality::P1080)],
    ]
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data_round_trips() {
        let data = CallbackData {
            kind: TargetKind::Collection,
            quality: Quality::P720,
            token: "18f2a4c1".into(),
        };
        assert_eq!(CallbackData::decode(&data.encode()).unwrap(), data);
    }

    #[test]
    fn callback_decode_rejects_malformed_payloads() {
        assert!(CallbackData::decode("").is_err());
        assert!(CallbackData::decode("x:720:tok").is_err());
        assert!(CallbackData::decode("s:4k:tok").is_err());
        assert!(CallbackData::decode("s:720").is_err());
        assert!(CallbackData::decode("s:720:").is_err());
    }

    #[test]
    fn callback_token_may_contain_delimiters() {
        // splitn(3) keeps everything after the second colon in the token
        let decoded = CallbackData::decode("s:audio:ab:cd").unwrap();
        assert_eq!(decoded.token, "ab:cd");
    }

    #[test]
    fn quality_menu_covers_all_qualities() {
        let menu = quality_menu(TargetKind::Single, "tok");
        let buttons: Vec<&Button> = menu.iter().flatten().collect();
        assert_eq!(buttons.len(), Quality::ALL.len());
        for b in buttons {
            let decoded = CallbackData::decode(&b.callback_data).unwrap();
            assert_eq!(decoded.kind, TargetKind::Single);
            assert_eq!(decoded.token, "tok");
        }
    }
}
