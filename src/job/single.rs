//! Single-item download/upload job
//!
//! Pipeline: metadata fetch (retried) → download (with concurrent progress
//! poller) → best-effort remux → size check → best-effort thumbnail fetch →
//! upload → cleanup. The cleanup block and the failure notice run no matter
//! which step failed; every error produces exactly one user-visible message.

use crate::channel::{ChatId, MessageId, UploadProgressFn};
use crate::error::{Error, Result};
use crate::job::{JobContext, Workspace, normalize_uploaded};
use crate::progress::{ProgressReporter, Stage, spawn_download_poller};
use crate::retry::retry_with_backoff;
use crate::types::{MediaMetadata, Quality, TransferProgress, format_size};
use crate::utils::unique_artifact_name;
use std::path::PathBuf;
use std::sync::Arc;

/// Orchestrates delivery of one media item at one quality
pub struct SingleItemJob {
    ctx: JobContext,
    chat: ChatId,
    quality: Quality,
}

impl SingleItemJob {
    /// Create a job for one destination chat and quality selection
    pub fn new(ctx: JobContext, chat: ChatId, quality: Quality) -> Self {
        Self { ctx, chat, quality }
    }

    /// Run the job to completion.
    ///
    /// On failure the user receives the error's remediation message; the
    /// status message and all temp artifacts are removed either way.
    pub async fn run(&self, url: &str) -> Result<()> {
        let status = self
            .ctx
            .channel
            .send_text(self.chat, "Fetching info...")
            .await?;

        let mut workspace = Workspace::new();
        let result = self.execute(url, status, &mut workspace).await;

        // Guaranteed cleanup: temp artifacts and the status message go away
        // regardless of which step failed
        workspace.cleanup().await;
        if let Err(e) = self.ctx.channel.delete_message(self.chat, status).await {
            tracing::debug!(error = %e, "Could not delete status message");
        }

        if let Err(e) = &result {
            tracing::error!(url, error = %e, "Job failed");
            if let Err(send_err) = self
                .ctx
                .channel
                .send_text(self.chat, &e.user_message())
                .await
            {
                tracing::warn!(error = %send_err, "Could not deliver failure notice");
            }
        }

        result
    }

    async fn execute(
        &self,
        url: &str,
        status: MessageId,
        workspace: &mut Workspace,
    ) -> Result<()> {
        // FETCH_METADATA, retried with a slow initial delay because upstream
        // rate limiting recovers slowly
        let extractor = Arc::clone(&self.ctx.extractor);
        let metadata = retry_with_backoff(&self.ctx.config.metadata_retry, "fetch_metadata", || {
            let extractor = Arc::clone(&extractor);
            let url = url.to_string();
            async move { extractor.fetch_metadata(&url).await }
        })
        .await
        .map_err(Error::Extractor)?;

        tracing::info!(
            title = %metadata.title,
            duration_secs = metadata.duration_secs,
            quality = ?self.quality,
            "Starting download"
        );

        if let Err(e) = self
            .ctx
            .channel
            .edit_text(
                self.chat,
                status,
                &format!("Downloading {} ({})...", metadata.title, self.quality.label()),
            )
            .await
        {
            tracing::warn!(error = %e, "Status edit failed, continuing");
        }

        // DOWNLOADING
        let dest = self.artifact_path(&metadata).await?;
        workspace.track(dest.clone());

        let estimated_total = self.quality.estimated_bytes(metadata.duration_secs);
        let reporter = ProgressReporter::new(
            Arc::clone(&self.ctx.channel),
            self.chat,
            status,
            Stage::Downloading,
            &self.ctx.config.progress,
        );
        let poller = spawn_download_poller(
            dest.clone(),
            estimated_total,
            self.ctx.config.pacing.download_poll_interval,
            reporter,
        );

        let download_result = self
            .ctx
            .extractor
            .download(url, self.quality.profile().format_selector, &dest)
            .await;
        poller.abort();
        download_result.map_err(Error::Extractor)?;

        // POSTPROCESSING (video only): best-effort remux, never fails the job
        let upload_path = if self.quality.is_video() {
            match self.ctx.transcoder.optimize(&dest).await {
                Ok(optimized) => {
                    if optimized != dest {
                        workspace.track(optimized.clone());
                    }
                    optimized
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Remux failed, uploading original file");
                    dest.clone()
                }
            }
        } else {
            dest.clone()
        };

        // SIZE_CHECK: too-large artifacts are never partially uploaded
        let actual_size = tokio::fs::metadata(&upload_path).await?.len();
        let limit = self.ctx.config.max_file_size_bytes();
        if actual_size > limit {
            return Err(Error::TooLarge {
                size_mb: actual_size / (1024 * 1024),
                limit_mb: self.ctx.config.transfer.max_file_size_mb,
            });
        }

        // THUMBNAIL_FETCH: a failure only drops the thumbnail
        let thumbnail = match self.fetch_thumbnail(&metadata).await {
            Ok(path) => {
                if let Some(p) = &path {
                    workspace.track(p.clone());
                }
                path
            }
            Err(e) => {
                tracing::warn!(error = %e, "Thumbnail fetch failed, uploading without one");
                None
            }
        };

        // UPLOADING
        self.upload(&metadata, status, &upload_path, thumbnail.as_deref(), actual_size)
            .await?;

        tracing::info!(title = %metadata.title, size = actual_size, "Delivered");
        Ok(())
    }

    /// Derive the temp artifact path, creating the temp directory if needed
    async fn artifact_path(&self, metadata: &MediaMetadata) -> Result<PathBuf> {
        let temp_dir = &self.ctx.config.transfer.temp_dir;
        tokio::fs::create_dir_all(temp_dir).await?;

        let extension = if self.quality.is_video() { "mp4" } else { "m4a" };
        Ok(temp_dir.join(unique_artifact_name(&metadata.title, extension)))
    }

    /// Fetch the best thumbnail candidate into the temp directory
    async fn fetch_thumbnail(&self, metadata: &MediaMetadata) -> Result<Option<PathBuf>> {
        let Some(thumbnail) = metadata.best_thumbnail() else {
            return Ok(None);
        };

        let bytes = reqwest::get(&thumbnail.url)
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let path = self
            .ctx
            .config
            .transfer
            .temp_dir
            .join(unique_artifact_name(&metadata.title, "jpg"));
        tokio::fs::write(&path, &bytes).await?;
        Ok(Some(path))
    }

    async fn upload(
        &self,
        metadata: &MediaMetadata,
        status: MessageId,
        path: &std::path::Path,
        thumbnail: Option<&std::path::Path>,
        total_bytes: u64,
    ) -> Result<()> {
        let caption = format!(
            "{}\n{} · {} · {}",
            metadata.title,
            metadata.uploader,
            metadata.format_duration(),
            format_size(total_bytes),
        );

        // The transport invokes the progress callback synchronously; reports
        // cross to an async task that owns the reporter and the edits
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<TransferProgress>();
        let mut reporter = ProgressReporter::new(
            Arc::clone(&self.ctx.channel),
            self.chat,
            status,
            Stage::Uploading,
            &self.ctx.config.progress,
        );
        let edit_task = tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                reporter.report(progress, "").await;
            }
        });

        let progress: UploadProgressFn = Arc::new(move |raw: f64| {
            let bytes_so_far = normalize_uploaded(raw, total_bytes);
            let _ = tx.send(TransferProgress {
                bytes_so_far,
                estimated_total: total_bytes,
            });
        });

        let result = self
            .ctx
            .channel
            .send_file(self.chat, path, &caption, thumbnail, progress)
            .await;

        edit_task.abort();
        result
    }
}
