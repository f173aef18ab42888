// components/media_downloader/src/lib.rs
mod locate;
mod types;
mod tracking;
mod workdir;
mod ytdlp;
#[cfg(any(test, feature = "stub"))]
pub mod stub;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use locate::{accept_reported, locate, DEFAULT_WHITELIST, OUTPUT_STEM};
pub use types::{
    Downloader, FetchError, FetchRequest, FetchedMedia, LocateError, MediaMetadata, Quality,
};
pub use tracking::strip_tracking_params;
pub use workdir::WorkingDir;
pub use ytdlp::YtDlp;

/// Prefix of the per-fetch working directories
pub const FETCH_DIR_PREFIX: &str = "fetch-";

pub struct MediaDownloader {
    downloader: Arc<dyn Downloader>,
}

impl std::fmt::Debug for MediaDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaDownloader").finish_non_exhaustive()
    }
}

impl MediaDownloader {
    /// Create a MediaDownloader using the `yt-dlp` found on `PATH`
    pub async fn new() -> Result<Self, FetchError> {
        Self::new_with_downloader(Arc::new(YtDlp::new("yt-dlp"))).await
    }

    /// Create a new MediaDownloader with a specific downloader implementation
    pub async fn new_with_downloader(downloader: Arc<dyn Downloader>) -> Result<Self, FetchError> {
        downloader.check_available().await?;
        Ok(Self { downloader })
    }

    /// Fetch the requested video into a fresh working directory under `parent`.
    ///
    /// On any error the working directory is removed before returning.
    pub async fn fetch(
        &self,
        request: &FetchRequest,
        parent: &Path,
        cancel: &CancellationToken,
    ) -> Result<FetchedMedia, FetchError> {
        let url = strip_tracking_params(request.source_url());
        if url != *request.source_url() {
            debug!(original = %request.source_url(), cleaned = %url, "stripped tracking parameters");
        }

        let dir = WorkingDir::create_in(parent, FETCH_DIR_PREFIX)?;

        let metadata = self.downloader.fetch_metadata(&url, cancel).await?;
        info!(title = %metadata.title, duration = ?metadata.duration, "resolved video");

        let reported = self
            .downloader
            .download_video(&url, request.quality(), dir.path(), OUTPUT_STEM, cancel)
            .await?;

        let artifact = match reported.as_deref().and_then(|path| accept_reported(dir.path(), path, DEFAULT_WHITELIST)) {
            Some(artifact) => artifact,
            None => {
                debug!(reported = ?reported, "no usable reported path, scanning working directory");
                locate(dir.path(), DEFAULT_WHITELIST).await?
            }
        };
        info!(path = %artifact.path().display(), container = %artifact.container(), "fetched video");

        Ok(FetchedMedia {
            dir,
            artifact,
            metadata,
            request: request.clone(),
            fetched_at: chrono::Utc::now(),
        })
    }
}

/// Working directories currently present under `parent`
pub fn list_working_dirs(parent: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(parent)? {
        let entry = entry?;
        if entry.file_type()?.is_dir()
            && entry
                .file_name()
                .to_string_lossy()
                .starts_with(FETCH_DIR_PREFIX)
        {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}
