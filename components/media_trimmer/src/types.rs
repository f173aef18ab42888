// components/media_trimmer/src/types.rs
use std::path::Path;

use async_trait::async_trait;
use media_primitives::WorkingArtifact;
use process_runner::CommandError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time_primitives::{MediaTime, TimeError, TimeRange};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum TrimError {
    #[error("Required dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Invalid trim range: {0}")]
    InvalidRange(#[from] TimeError),

    #[error("Trimming failed: {0}")]
    ProcessingFailed(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrimError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TrimError::Command(e) if e.is_cancelled())
    }
}

/// What a probe learned about a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: Option<MediaTime>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// A validated request to cut `[start, end)` out of `source`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimRequest {
    source: WorkingArtifact,
    range: TimeRange,
    source_info: Option<MediaInfo>,
}

impl TrimRequest {
    /// Rejects `end <= start`, and `end` past the source when its duration is known
    pub fn new(
        source: WorkingArtifact,
        start: MediaTime,
        end: MediaTime,
        source_info: Option<MediaInfo>,
    ) -> Result<Self, TrimError> {
        let duration = source_info.and_then(|info| info.duration);
        let range = TimeRange::within(start, end, duration)?;
        Ok(Self {
            source,
            range,
            source_info,
        })
    }

    pub fn source(&self) -> &WorkingArtifact {
        &self.source
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn source_info(&self) -> Option<MediaInfo> {
        self.source_info
    }
}

#[async_trait]
pub trait Trimmer: Send + Sync {
    /// Check the encoder and prober can be run
    async fn check_available(&self) -> Result<(), TrimError>;

    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<MediaInfo, TrimError>;

    /// Encode `range` of `source` into `output` as MP4, whatever `output`'s extension
    async fn encode(
        &self,
        source: &Path,
        range: TimeRange,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TrimError>;
}
