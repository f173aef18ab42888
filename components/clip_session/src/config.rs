// components/clip_session/src/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use media_downloader::Quality;
use serde::{Deserialize, Serialize};

/// Pipeline configuration
///
/// Timeouts are in seconds; `0` disables the timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory under which every session gets its own working root
    pub work_root: PathBuf,

    pub ytdlp_program: PathBuf,
    pub ffmpeg_program: PathBuf,
    pub ffprobe_program: PathBuf,

    /// Limit for a download, which depends on network conditions
    pub fetch_timeout_secs: u64,

    pub trim_timeout_secs: u64,

    /// Limit for metadata lookups and media probes
    pub probe_timeout_secs: u64,

    pub default_quality: Quality,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("clip-pipeline"),
            ytdlp_program: PathBuf::from("yt-dlp"),
            ffmpeg_program: PathBuf::from("ffmpeg"),
            ffprobe_program: PathBuf::from("ffprobe"),
            fetch_timeout_secs: 15 * 60,
            trim_timeout_secs: 10 * 60,
            probe_timeout_secs: 30,
            default_quality: Quality::Best,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON configuration file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        as_timeout(self.fetch_timeout_secs)
    }

    pub fn trim_timeout(&self) -> Option<Duration> {
        as_timeout(self.trim_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        as_timeout(self.probe_timeout_secs)
    }
}

fn as_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
