//! Collection download job
//!
//! Drives single-item jobs sequentially over an ordered listing — never
//! concurrently, since upstream rate limits make parallel fetches
//! counterproductive. One item's failure never aborts the run; the batch
//! keeps a running tally and closes with a summary message.

use crate::channel::ChatId;
use crate::error::Result;
use crate::job::{JobContext, SingleItemJob};
use crate::types::{CollectionSession, Quality};

/// Final tally for a collection run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items delivered successfully
    pub succeeded: usize,
    /// Items that failed after retries
    pub failed: usize,
}

/// Sequentially delivers every item of a cached collection session
pub struct CollectionJob {
    ctx: JobContext,
    chat: ChatId,
    quality: Quality,
}

impl CollectionJob {
    /// Create a collection job for one destination chat and quality
    pub fn new(ctx: JobContext, chat: ChatId, quality: Quality) -> Self {
        Self { ctx, chat, quality }
    }

    /// Run the batch to completion and return the tally.
    ///
    /// Failed items have already produced their own per-item failure
    /// message by the time this returns; the summary only reports totals.
    pub async fn run(&self, session: &CollectionSession) -> Result<BatchSummary> {
        let total = session.items.len();
        tracing::info!(
            total,
            request_id = %session.request_id,
            quality = ?self.quality,
            "Starting collection job"
        );

        let aggregate = self
            .ctx
            .channel
            .send_text(self.chat, &format!("Starting batch: {total} items"))
            .await?;

        let mut summary = BatchSummary {
            succeeded: 0,
            failed: 0,
        };

        for (index, item) in session.items.iter().enumerate() {
            // Pacing before every item except the first
            if index > 0 {
                tokio::time::sleep(self.ctx.config.pacing.collection_item_delay).await;
            }

            let header = format!(
                "Item {}/{} — {} ok, {} failed\n{}",
                index + 1,
                total,
                summary.succeeded,
                summary.failed,
                item.title,
            );
            if let Err(e) = self.ctx.channel.edit_text(self.chat, aggregate, &header).await {
                tracing::warn!(error = %e, "Aggregate status edit failed, continuing");
            }

            let job = SingleItemJob::new(self.ctx.clone(), self.chat, self.quality);
            match job.run(&item.url).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    // The single job already delivered the per-item failure
                    // message; just count it
                    tracing::warn!(
                        index = index + 1,
                        url = %item.url,
                        error = %e,
                        "Collection item failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        if let Err(e) = self.ctx.channel.delete_message(self.chat, aggregate).await {
            tracing::debug!(error = %e, "Could not delete aggregate status message");
        }

        self.ctx
            .channel
            .send_text(
                self.chat,
                &format!(
                    "Batch complete: {} delivered, {} failed out of {total}.",
                    summary.succeeded, summary.failed
                ),
            )
            .await?;

        tracing::info!(?summary, "Collection job finished");
        Ok(summary)
    }
}
