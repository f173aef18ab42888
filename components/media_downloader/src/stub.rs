// components/media_downloader/src/stub.rs
//! In-process [`Downloader`] that writes a small placeholder file instead of
//! contacting any site.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use process_runner::CommandError;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::types::{Downloader, FetchError, MediaMetadata, Quality};

pub struct DownloaderStub {
    title: String,
    duration: Option<f64>,
    extension: &'static str,
    failure: Option<String>,
    report_path: bool,
    downloads: AtomicUsize,
}

impl Default for DownloaderStub {
    fn default() -> Self {
        Self {
            title: "Test Video".to_string(),
            duration: Some(30.0),
            extension: "mp4",
            failure: None,
            report_path: true,
            downloads: AtomicUsize::new(0),
        }
    }
}

impl DownloaderStub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_extension(mut self, extension: &'static str) -> Self {
        self.extension = extension;
        self
    }

    /// Every download fails as if the tool had exited nonzero with `stderr`
    pub fn failing(mut self, stderr: impl Into<String>) -> Self {
        self.failure = Some(stderr.into());
        self
    }

    /// Write the file but do not report its path, forcing a directory scan
    pub fn without_reported_path(mut self) -> Self {
        self.report_path = false;
        self
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for DownloaderStub {
    async fn check_available(&self) -> Result<(), FetchError> {
        Ok(())
    }

    async fn fetch_metadata(
        &self,
        _url: &Url,
        cancel: &CancellationToken,
    ) -> Result<MediaMetadata, FetchError> {
        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled {
                program: PathBuf::from("yt-dlp"),
            }
            .into());
        }
        Ok(MediaMetadata {
            title: self.title.clone(),
            uploader: Some("Test Channel".to_string()),
            duration: self.duration,
            webpage_url: Some("https://example.com/watch?v=test".to_string()),
        })
    }

    async fn download_video(
        &self,
        _url: &Url,
        _quality: Quality,
        dir: &Path,
        stem: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>, FetchError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        // a partial file is what an interrupted tool leaves behind
        tokio::fs::write(dir.join(format!("{}.{}.part", stem, self.extension)), b"partial").await?;
        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled {
                program: PathBuf::from("yt-dlp"),
            }
            .into());
        }
        if let Some(stderr) = &self.failure {
            return Err(FetchError::ToolFailed(stderr.clone()));
        }

        tokio::fs::remove_file(dir.join(format!("{}.{}.part", stem, self.extension))).await?;
        let path = dir.join(format!("{}.{}", stem, self.extension));
        tokio::fs::write(&path, b"fake video bytes").await?;
        Ok(self.report_path.then_some(path))
    }
}
