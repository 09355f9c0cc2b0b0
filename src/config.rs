//! Configuration types for media-courier

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Transfer limits and temp storage
///
/// Groups settings related to artifact size and on-disk staging.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Maximum artifact size in megabytes (default: 50)
    ///
    /// Artifacts exceeding this after download are deleted and the job fails
    /// with a "too large" message; no partial upload is attempted.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Temporary directory for in-flight artifacts (default: "./tmp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            temp_dir: default_temp_dir(),
        }
    }
}

/// Session cache behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for quality-selection and collection sessions (default: 600 seconds)
    #[serde(default = "default_session_ttl", with = "duration_serde")]
    pub session_ttl: Duration,

    /// Interval between eviction sweep passes (default: 60 seconds)
    ///
    /// Sweep semantics are best-effort: an entry logically past its TTL may
    /// still be returned by a lookup until the next sweep runs.
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            session_ttl: default_session_ttl(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Retry behavior for transient upstream failures
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles before each subsequent one
    /// (default: 5 seconds — upstream rate limiting recovers slowly)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
        }
    }
}

/// Pacing delays between sequential upstream calls
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Delay before every collection item except the first (default: 5 seconds)
    #[serde(default = "default_item_delay", with = "duration_serde")]
    pub collection_item_delay: Duration,

    /// Delay between enumeration windows (default: 1 second)
    #[serde(default = "default_page_delay", with = "duration_serde")]
    pub enumeration_page_delay: Duration,

    /// How often the partial-file poller samples download progress (default: 1 second)
    #[serde(default = "default_page_delay", with = "duration_serde")]
    pub download_poll_interval: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            collection_item_delay: default_item_delay(),
            enumeration_page_delay: default_page_delay(),
            download_poll_interval: default_page_delay(),
        }
    }
}

/// Progress edit throttling
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Minimum interval between status edits during download (default: 5 seconds)
    #[serde(default = "default_download_edit_interval", with = "duration_serde")]
    pub download_edit_interval: Duration,

    /// Minimum interval between status edits during upload (default: 10 seconds)
    #[serde(default = "default_upload_edit_interval", with = "duration_serde")]
    pub upload_edit_interval: Duration,

    /// During upload, also push when the percentage has advanced this many
    /// points since the last edit, even inside the interval (default: 5)
    #[serde(default = "default_upload_edit_step")]
    pub upload_edit_step: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            download_edit_interval: default_download_edit_interval(),
            upload_edit_interval: default_upload_edit_interval(),
            upload_edit_step: default_upload_edit_step(),
        }
    }
}

/// Enumeration API server settings
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port the enumeration API listens on (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Window size for paginated collection fetches (default: 100)
    #[serde(default = "default_window_size")]
    pub window_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            window_size: default_window_size(),
        }
    }
}

/// Main configuration for media-courier
///
/// Fields are organized into logical sub-configs:
/// - [`transfer`](TransferConfig) — size limits, temp storage
/// - [`cache`](CacheConfig) — session TTL and sweep granularity
/// - [`metadata_retry`](RetryConfig) — backoff around metadata fetches
/// - [`pacing`](PacingConfig) — inter-item and inter-page delays
/// - [`progress`](ProgressConfig) — edit throttling
/// - [`api`](ApiConfig) — enumeration HTTP surface
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Transfer limits and temp storage
    #[serde(flatten)]
    pub transfer: TransferConfig,

    /// Session cache behavior
    #[serde(flatten)]
    pub cache: CacheConfig,

    /// Retry behavior for metadata fetches
    #[serde(default)]
    pub metadata_retry: RetryConfig,

    /// Pacing delays
    #[serde(flatten)]
    pub pacing: PacingConfig,

    /// Progress edit throttling
    #[serde(flatten)]
    pub progress: ProgressConfig,

    /// Enumeration API settings
    #[serde(flatten)]
    pub api: ApiConfig,
}

impl Config {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `MAX_FILE_SIZE_MB` — maximum artifact size in megabytes (default: 50)
    /// - `PORT` — enumeration API port (default: 3000)
    ///
    /// Unparseable values fall back to the default with a warning rather
    /// than failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("MAX_FILE_SIZE_MB") {
            match raw.parse::<u64>() {
                Ok(mb) if mb > 0 => config.transfer.max_file_size_mb = mb,
                _ => {
                    tracing::warn!(
                        value = %raw,
                        default = config.transfer.max_file_size_mb,
                        "Ignoring unparseable MAX_FILE_SIZE_MB"
                    );
                }
            }
        }

        if let Ok(raw) = std::env::var("PORT") {
            match raw.parse::<u16>() {
                Ok(port) => config.api.port = port,
                Err(_) => {
                    tracing::warn!(
                        value = %raw,
                        default = config.api.port,
                        "Ignoring unparseable PORT"
                    );
                }
            }
        }

        config
    }

    /// Maximum artifact size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.transfer.max_file_size_mb * 1024 * 1024
    }
}

fn default_max_file_size_mb() -> u64 {
    50
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./tmp")
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(600)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_item_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_page_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_download_edit_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_upload_edit_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_upload_edit_step() -> u8 {
    5
}

fn default_port() -> u16 {
    3000
}

fn default_window_size() -> u32 {
    100
}

// Duration serialization helper (seconds as integers)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
