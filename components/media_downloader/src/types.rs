// components/media_downloader/src/types.rs
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use media_primitives::WorkingArtifact;
use process_runner::CommandError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::workdir::WorkingDir;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("no media file found in {}", dir.display())]
    NotFound { dir: PathBuf },

    #[error("failed to list {}", dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Required dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown quality '{0}' (expected best, 1080p, 720p, 480p or 360p)")]
    UnknownQuality(String),

    #[error("Download failed: {0}")]
    ToolFailed(String),

    #[error("Downloaded media not found: {0}")]
    NotFound(#[from] LocateError),

    #[error("Unreadable metadata: {0}")]
    Metadata(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Command(e) if e.is_cancelled())
    }
}

/// Closed set of resolutions the caller may ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    #[default]
    #[serde(rename = "best")]
    Best,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
}

impl Quality {
    pub fn max_height(&self) -> Option<u32> {
        match self {
            Quality::Best => None,
            Quality::P1080 => Some(1080),
            Quality::P720 => Some(720),
            Quality::P480 => Some(480),
            Quality::P360 => Some(360),
        }
    }

    /// yt-dlp `-f` expression: separate streams merged, else the best single file
    pub fn format_selector(&self) -> String {
        match self.max_height() {
            None => "bestvideo+bestaudio/best".to_string(),
            Some(height) => format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
                h = height
            ),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_height() {
            None => f.write_str("best"),
            Some(height) => write!(f, "{}p", height),
        }
    }
}

impl FromStr for Quality {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "best" {
            return Ok(Quality::Best);
        }
        // a bare height is accepted as well
        match normalized.strip_suffix('p').unwrap_or(normalized.as_str()) {
            "1080" => Ok(Quality::P1080),
            "720" => Ok(Quality::P720),
            "480" => Ok(Quality::P480),
            "360" => Ok(Quality::P360),
            _ => Err(FetchError::UnknownQuality(s.to_string())),
        }
    }
}

/// What to fetch and at which quality; fixed once constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    source_url: Url,
    quality: Quality,
}

impl FetchRequest {
    pub fn new(source_url: &str, quality: Quality) -> Result<Self, FetchError> {
        let source_url = Url::parse(source_url.trim())
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", source_url, e)))?;
        match source_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(FetchError::InvalidUrl(format!(
                    "unsupported scheme '{}' in {}",
                    other, source_url
                )))
            }
        }
        if source_url.host_str().is_none() {
            return Err(FetchError::InvalidUrl(format!("missing host in {}", source_url)));
        }
        Ok(Self {
            source_url,
            quality,
        })
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,

    pub uploader: Option<String>,

    /// Duration in seconds, absent for live streams
    pub duration: Option<f64>,

    /// Canonical page URL as reported by the site
    pub webpage_url: Option<String>,
}

/// Result of a successful fetch: the located artifact and the directory that owns it
#[derive(Debug)]
pub struct FetchedMedia {
    pub dir: WorkingDir,
    pub artifact: WorkingArtifact,
    pub metadata: MediaMetadata,
    pub request: FetchRequest,
    pub fetched_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Check if the downloader is available and has all required dependencies
    async fn check_available(&self) -> Result<(), FetchError>;

    /// Fetch metadata about a video without downloading it
    async fn fetch_metadata(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<MediaMetadata, FetchError>;

    /// Download into `dir` as `<stem>.<ext>`; returns the final path if the tool reported one
    async fn download_video(
        &self,
        url: &Url,
        quality: Quality,
        dir: &Path,
        stem: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("best", Quality::Best)]
    #[case("BEST", Quality::Best)]
    #[case("1080p", Quality::P1080)]
    #[case("720p", Quality::P720)]
    #[case("720", Quality::P720)]
    #[case(" 480P ", Quality::P480)]
    #[case("360p", Quality::P360)]
    fn parses_quality(#[case] input: &str, #[case] expected: Quality) {
        assert_eq!(input.parse::<Quality>().unwrap(), expected);
    }

    #[rstest]
    #[case("4k")]
    #[case("240p")]
    #[case("")]
    #[case("p")]
    #[case("bestp")]
    #[case("720pp")]
    #[case("1080ppp")]
    fn rejects_unknown_quality(#[case] input: &str) {
        assert_matches!(input.parse::<Quality>(), Err(FetchError::UnknownQuality(_)));
    }

    #[test]
    fn quality_maps_to_format_selector() {
        assert_eq!(Quality::Best.format_selector(), "bestvideo+bestaudio/best");
        assert_eq!(
            Quality::P720.format_selector(),
            "bestvideo[height<=720]+bestaudio/best[height<=720]"
        );
        assert_eq!(Quality::P360.to_string(), "360p");
        assert_eq!(serde_json::to_string(&Quality::P480).unwrap(), "\"480p\"");
    }

    #[test]
    fn request_requires_http_url() {
        assert!(FetchRequest::new("https://www.youtube.com/watch?v=abc", Quality::Best).is_ok());
        assert_matches!(
            FetchRequest::new("not a url", Quality::Best),
            Err(FetchError::InvalidUrl(_))
        );
        assert_matches!(
            FetchRequest::new("file:///etc/passwd", Quality::Best),
            Err(FetchError::InvalidUrl(_))
        );
    }

    #[test]
    fn request_keeps_original_url() {
        let request = FetchRequest::new(" https://youtu.be/abc?si=share ", Quality::P720).unwrap();
        assert_eq!(request.source_url().as_str(), "https://youtu.be/abc?si=share");
        assert_eq!(request.quality(), Quality::P720);
    }
}
