//! Throttled, monotonic progress reporting
//!
//! Renders a fixed-width block-glyph bar and drives periodic status-message
//! edits during the download and upload phases. Edits are rate-limited so a
//! chatty transfer cannot flood the message channel, and edit failures are
//! swallowed — a progress fault must never abort the job.

use crate::channel::{ChatId, MessageChannel, MessageId};
use crate::config::ProgressConfig;
use crate::types::TransferProgress;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Number of segments in the rendered bar
const BAR_SEGMENTS: u32 = 10;

/// Percentage cap during download, where the total is only an estimate;
/// 100 is reserved for confirmed completion
pub const DOWNLOAD_CAP: u8 = 99;

/// Percentage cap during upload, where the true total is known
pub const UPLOAD_CAP: u8 = 100;

/// Render a 10-segment progress bar labeled with the percentage.
///
/// Values above 100 clamp to a full bar.
pub fn render_bar(percentage: u32) -> String {
    let pct = percentage.min(100);
    let filled = (pct * BAR_SEGMENTS / 100) as usize;
    let empty = BAR_SEGMENTS as usize - filled;
    format!("{}{} {pct}%", "█".repeat(filled), "░".repeat(empty))
}

/// Which transfer phase a report belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Pulling bytes from the extractor
    Downloading,
    /// Pushing the artifact to the message channel
    Uploading,
}

/// Decides whether a progress update warrants a message edit.
///
/// Download pushes at most once per `min_interval`. Upload additionally
/// pushes when the percentage has advanced `min_step` points since the last
/// edit, keeping the UI responsive near completion without flooding edits
/// during slow uniform progress.
#[derive(Debug)]
pub struct EditThrottle {
    min_interval: Duration,
    min_step: Option<u8>,
    last_push: Option<(Instant, u8)>,
}

impl EditThrottle {
    /// Throttle for the download phase: interval-only
    pub fn download(config: &ProgressConfig) -> Self {
        Self {
            min_interval: config.download_edit_interval,
            min_step: None,
            last_push: None,
        }
    }

    /// Throttle for the upload phase: interval or percentage step
    pub fn upload(config: &ProgressConfig) -> Self {
        Self {
            min_interval: config.upload_edit_interval,
            min_step: Some(config.upload_edit_step),
            last_push: None,
        }
    }

    /// Record-and-decide: returns true when an edit should be pushed now
    pub fn should_push(&mut self, now: Instant, percentage: u8) -> bool {
        let push = match self.last_push {
            None => true,
            Some((at, last_pct)) => {
                let elapsed = now.duration_since(at) >= self.min_interval;
                let stepped = self
                    .min_step
                    .is_some_and(|step| percentage.saturating_sub(last_pct) >= step);
                elapsed || stepped
            }
        };
        if push {
            self.last_push = Some((now, percentage));
        }
        push
    }
}

/// Drives status-message edits for one job's transfer phases
pub struct ProgressReporter {
    channel: Arc<dyn MessageChannel>,
    chat: ChatId,
    message: MessageId,
    throttle: EditThrottle,
    stage: Stage,
}

impl ProgressReporter {
    /// Create a reporter bound to an existing status message
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        chat: ChatId,
        message: MessageId,
        stage: Stage,
        config: &ProgressConfig,
    ) -> Self {
        let throttle = match stage {
            Stage::Downloading => EditThrottle::download(config),
            Stage::Uploading => EditThrottle::upload(config),
        };
        Self {
            channel,
            chat,
            message,
            throttle,
            stage,
        }
    }

    /// Report a progress snapshot, editing the status message if the
    /// throttle allows. Edit failures are logged and swallowed.
    pub async fn report(&mut self, progress: TransferProgress, extra: &str) {
        let cap = match self.stage {
            Stage::Downloading => DOWNLOAD_CAP,
            Stage::Uploading => UPLOAD_CAP,
        };
        let pct = progress.percentage(cap);

        if !self.throttle.should_push(Instant::now(), pct) {
            return;
        }

        let verb = match self.stage {
            Stage::Downloading => "Downloading",
            Stage::Uploading => "Uploading",
        };
        let text = if extra.is_empty() {
            format!("{verb}...\n{}", render_bar(pct as u32))
        } else {
            format!("{verb} {extra}\n{}", render_bar(pct as u32))
        };

        if let Err(e) = self.channel.edit_text(self.chat, self.message, &text).await {
            tracing::warn!(error = %e, "Progress edit failed, continuing");
        }
    }
}

/// Spawn the download-phase poller: samples the partial file's size every
/// poll tick and feeds the reporter. The job aborts the handle when the
/// download call returns.
pub fn spawn_download_poller(
    path: PathBuf,
    estimated_total: u64,
    poll_interval: Duration,
    mut reporter: ProgressReporter,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            let bytes_so_far = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta.len(),
                // The extractor may not have created the file yet
                Err(_) => continue,
            };
            let progress = TransferProgress {
                bytes_so_far,
                estimated_total,
            };
            reporter.report(progress, "").await;
        }
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_zero_is_all_empty() {
        assert_eq!(render_bar(0), "░░░░░░░░░░ 0%");
    }

    #[test]
    fn render_55_fills_five_segments() {
        assert_eq!(render_bar(55), "█████░░░░░ 55%");
    }

    #[test]
    fn render_overflow_clamps_to_full() {
        assert_eq!(render_bar(137), "██████████ 100%");
    }

    #[test]
    fn render_100_is_full() {
        assert_eq!(render_bar(100), "██████████ 100%");
    }

    fn progress_config() -> ProgressConfig {
        ProgressConfig::default()
    }

    #[test]
    fn download_throttle_pushes_first_then_waits_interval() {
        let mut throttle = EditThrottle::download(&progress_config());
        let t0 = Instant::now();

        assert!(throttle.should_push(t0, 0), "first report always pushes");
        assert!(!throttle.should_push(t0 + Duration::from_secs(2), 40));
        assert!(throttle.should_push(t0 + Duration::from_secs(5), 60));
    }

    #[test]
    fn download_throttle_ignores_percentage_jumps() {
        let mut throttle = EditThrottle::download(&progress_config());
        let t0 = Instant::now();

        assert!(throttle.should_push(t0, 0));
        // A 50-point jump inside the interval still waits during download
        assert!(!throttle.should_push(t0 + Duration::from_secs(1), 50));
    }

    #[test]
    fn upload_throttle_pushes_on_step_inside_interval() {
        let mut throttle = EditThrottle::upload(&progress_config());
        let t0 = Instant::now();

        assert!(throttle.should_push(t0, 0));
        assert!(!throttle.should_push(t0 + Duration::from_secs(1), 3));
        assert!(
            throttle.should_push(t0 + Duration::from_secs(2), 5),
            "5-point advance pushes even inside the 10s interval"
        );
    }

    #[test]
    fn upload_throttle_pushes_on_interval_without_step() {
        let mut throttle = EditThrottle::upload(&progress_config());
        let t0 = Instant::now();

        assert!(throttle.should_push(t0, 50));
        assert!(!throttle.should_push(t0 + Duration::from_secs(9), 52));
        assert!(
            throttle.should_push(t0 + Duration::from_secs(10), 52),
            "10s elapsed pushes even with tiny advance"
        );
    }

    #[test]
    fn upload_step_measures_from_last_push() {
        let mut throttle = EditThrottle::upload(&progress_config());
        let t0 = Instant::now();

        assert!(throttle.should_push(t0, 0));
        assert!(!throttle.should_push(t0 + Duration::from_secs(1), 4));
        // 4 points since last *push* (0), not since last report
        assert!(!throttle.should_push(t0 + Duration::from_secs(2), 4));
        assert!(throttle.should_push(t0 + Duration::from_secs(3), 6));
    }
}
