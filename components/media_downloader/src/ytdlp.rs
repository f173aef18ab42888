// components/media_downloader/src/ytdlp.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use process_runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::types::{Downloader, FetchError, MediaMetadata, Quality};

/// Lines of stderr carried into error messages
const STDERR_TAIL_LINES: usize = 5;

/// [`Downloader`] backed by the `yt-dlp` command line tool
pub struct YtDlp {
    program: PathBuf,
    runner: Arc<dyn CommandRunner>,
    download_timeout: Option<Duration>,
    metadata_timeout: Option<Duration>,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_runner(program, Arc::new(SystemRunner))
    }

    pub fn with_runner(program: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
            download_timeout: None,
            metadata_timeout: None,
        }
    }

    pub fn download_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn metadata_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    pub fn metadata_command(&self, url: &Url) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(["--dump-json", "--no-download", "--no-playlist", "--no-warnings"])
            .arg(url.as_str())
            .timeout(self.metadata_timeout)
    }

    pub fn download_command(&self, url: &Url, quality: Quality, dir: &Path, stem: &str) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(["--no-playlist", "--no-progress", "--no-warnings"])
            .arg("--format")
            .arg(quality.format_selector())
            .args(["--merge-output-format", "mp4"])
            .arg("--output")
            .arg(dir.join(format!("{}.%(ext)s", stem)))
            .args(["--no-simulate", "--print", "after_move:filepath"])
            .arg(url.as_str())
            .current_dir(dir)
            .timeout(self.download_timeout)
    }

    fn check_success(output: CommandOutput) -> Result<CommandOutput, FetchError> {
        if output.success {
            Ok(output)
        } else {
            Err(FetchError::ToolFailed(output.stderr_tail(STDERR_TAIL_LINES)))
        }
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn check_available(&self) -> Result<(), FetchError> {
        process_runner::check_available(&self.program)
            .map(|_| ())
            .map_err(|_| FetchError::DependencyNotFound(self.program.display().to_string()))
    }

    async fn fetch_metadata(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<MediaMetadata, FetchError> {
        debug!(%url, "fetching metadata");
        let output = self.runner.run(&self.metadata_command(url), cancel).await?;
        let output = Self::check_success(output)?;

        // one JSON document per video
        let document = output
            .stdout
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| FetchError::Metadata("yt-dlp printed no metadata".to_string()))?;
        let meta: YtDlpMetadata =
            serde_json::from_str(document).map_err(|e| FetchError::Metadata(e.to_string()))?;

        Ok(MediaMetadata {
            title: meta.title,
            uploader: meta.uploader,
            duration: meta.duration,
            webpage_url: meta.webpage_url,
        })
    }

    async fn download_video(
        &self,
        url: &Url,
        quality: Quality,
        dir: &Path,
        stem: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>, FetchError> {
        info!(%url, %quality, dir = %dir.display(), "downloading video");
        let output = self
            .runner
            .run(&self.download_command(url, quality, dir, stem), cancel)
            .await?;
        let output = Self::check_success(output)?;

        Ok(output
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from))
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpMetadata {
    title: String,
    uploader: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
}
