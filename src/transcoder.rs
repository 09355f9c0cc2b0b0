//! Transcoder collaborator contract and ffmpeg-backed implementation
//!
//! The only transformation the orchestrator asks for is a playback
//! optimization remux (relocating the streaming index to the front of the
//! container). The step is best-effort: callers fall back to the original
//! file on any failure and never fail the job over it.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Abstract transcoder producing a playback-optimized artifact
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Produce a streaming-optimized copy of `input`, returning its path.
    ///
    /// Returning the input path unchanged is valid (nothing to do). On
    /// error, callers continue with the original file.
    async fn optimize(&self, input: &Path) -> Result<PathBuf>;
}

/// Transcoder that performs no optimization
pub struct NoOpTranscoder;

#[async_trait]
impl Transcoder for NoOpTranscoder {
    async fn optimize(&self, input: &Path) -> Result<PathBuf> {
        Ok(input.to_path_buf())
    }
}

/// ffmpeg-backed transcoder: stream-copy remux with a relocated moov atom
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    /// Locate ffmpeg on PATH
    pub fn discover() -> Result<Self> {
        let binary = which::which("ffmpeg")
            .map_err(|e| Error::Other(format!("ffmpeg not found: {e}")))?;
        Ok(Self { binary })
    }

    /// Use an explicit ffmpeg binary path
    pub fn with_binary(binary: PathBuf) -> Self {
        Self { binary }
    }
}

/// Output path for the optimized copy, next to the input
fn optimized_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    input.with_file_name(format!("{stem}.faststart.mp4"))
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn optimize(&self, input: &Path) -> Result<PathBuf> {
        let output = optimized_path(input);

        tracing::debug!(
            input = %input.display(),
            output = %output.display(),
            "Remuxing for streaming playback"
        );

        let status = Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c", "copy", "-movflags", "+faststart"])
            .arg(&output)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Other(format!("failed to spawn ffmpeg: {e}")))?;

        if !status.status.success() {
            // Leave no partial output behind
            let _ = tokio::fs::remove_file(&output).await;
            let stderr = String::from_utf8_lossy(&status.stderr);
            return Err(Error::Other(format!(
                "ffmpeg remux failed: {}",
                stderr.trim()
            )));
        }

        Ok(output)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimized_path_sits_next_to_input() {
        let out = optimized_path(Path::new("/tmp/work/video-123.mp4"));
        assert_eq!(out, PathBuf::from("/tmp/work/video-123.faststart.mp4"));
    }

    #[tokio::test]
    async fn noop_returns_input_unchanged() {
        let input = Path::new("/tmp/a.mp4");
        let out = NoOpTranscoder.optimize(input).await.unwrap();
        assert_eq!(out, input);
    }
}
