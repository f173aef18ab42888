//! Media artifact primitives shared by the fetch, trim and session components
//!
//! A [`WorkingArtifact`] is a transient media file on local storage that was
//! produced either by fetching a remote resource or by trimming another
//! artifact. The artifact only describes the file; ownership of the bytes on
//! disk (and their cleanup) belongs to whoever holds the working directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ArtifactError {
    #[error("unsupported container extension: {0}")]
    UnsupportedContainer(String),
    #[error("path has no file extension: {0}")]
    MissingExtension(PathBuf),
}

/// Container formats the pipeline accepts as playable media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Mp4,
    Mkv,
    Webm,
}

impl ContainerKind {
    pub const ALL: [ContainerKind; 3] = [ContainerKind::Mp4, ContainerKind::Mkv, ContainerKind::Webm];

    pub fn extension(&self) -> &'static str {
        match self {
            ContainerKind::Mp4 => "mp4",
            ContainerKind::Mkv => "mkv",
            ContainerKind::Webm => "webm",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.extension().eq_ignore_ascii_case(ext))
    }

    pub fn from_path(path: &Path) -> Result<Self, ArtifactError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| ArtifactError::MissingExtension(path.to_path_buf()))?;
        Self::from_extension(ext).ok_or_else(|| ArtifactError::UnsupportedContainer(ext.to_string()))
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ContainerKind {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| ArtifactError::UnsupportedContainer(s.to_string()))
    }
}

/// Which pipeline stage produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactOrigin {
    Fetch,
    Trim,
}

impl fmt::Display for ArtifactOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactOrigin::Fetch => f.write_str("fetched"),
            ArtifactOrigin::Trim => f.write_str("trimmed"),
        }
    }
}

/// A media file produced by one of the pipeline stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingArtifact {
    path: PathBuf,
    container: ContainerKind,
    origin: ArtifactOrigin,
}

impl WorkingArtifact {
    pub fn new(path: impl Into<PathBuf>, container: ContainerKind, origin: ArtifactOrigin) -> Self {
        Self {
            path: path.into(),
            container,
            origin,
        }
    }

    /// Build an artifact, deriving the container from the file extension
    pub fn from_path(path: impl Into<PathBuf>, origin: ArtifactOrigin) -> Result<Self, ArtifactError> {
        let path = path.into();
        let container = ContainerKind::from_path(&path)?;
        Ok(Self::new(path, container, origin))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn container(&self) -> ContainerKind {
        self.container
    }

    pub fn origin(&self) -> ArtifactOrigin {
        self.origin
    }

    /// File name offered to a user downloading this artifact
    pub fn download_name(&self, title: Option<&str>) -> String {
        let stem = title
            .map(sanitize_filename::sanitize)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                self.path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "video".to_string());

        match self.origin {
            ArtifactOrigin::Fetch => format!("{}.{}", stem, self.container),
            ArtifactOrigin::Trim => format!("cropped_{}.{}", stem, self.container),
        }
    }
}
