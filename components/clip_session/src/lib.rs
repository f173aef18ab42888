// components/clip_session/src/lib.rs
//! Fetch → trim sessions over the downloader and trimmer components.
//!
//! A [`ClipPipeline`] holds the shared, stateless stages and hands out
//! [`Session`]s. Each session owns a private temporary root under the
//! configured work root, so concurrent sessions never share files.

mod cleanup;
mod config;
mod error;
mod session;
mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use media_downloader::{MediaDownloader, YtDlp};
use media_trimmer::{Ffmpeg, MediaTrimmer};
use tracing::info;

pub use cleanup::{release_artifact, release_fetched};
pub use config::{ConfigError, PipelineConfig};
pub use error::SessionError;
pub use session::Session;
pub use state::{Phase, SessionSnapshot};

/// Prefix of each session's root directory under the work root
pub const SESSION_DIR_PREFIX: &str = "session-";

pub struct ClipPipeline {
    config: PipelineConfig,
    downloader: Arc<MediaDownloader>,
    trimmer: Arc<MediaTrimmer>,
    next_id: AtomicU64,
}

impl ClipPipeline {
    /// Build the pipeline on the external tools named in `config`.
    ///
    /// Fails if any of them cannot be found.
    pub async fn new(config: PipelineConfig) -> Result<Self, SessionError> {
        let ytdlp = YtDlp::new(&config.ytdlp_program)
            .download_timeout(config.fetch_timeout())
            .metadata_timeout(config.probe_timeout());
        let ffmpeg = Ffmpeg::new(&config.ffmpeg_program, &config.ffprobe_program)
            .encode_timeout(config.trim_timeout())
            .probe_timeout(config.probe_timeout());

        let downloader = MediaDownloader::new_with_downloader(Arc::new(ytdlp)).await?;
        let trimmer = MediaTrimmer::new_with_trimmer(Arc::new(ffmpeg)).await?;
        Self::with_stages(config, Arc::new(downloader), Arc::new(trimmer))
    }

    /// Build the pipeline on already constructed stages
    pub fn with_stages(
        config: PipelineConfig,
        downloader: Arc<MediaDownloader>,
        trimmer: Arc<MediaTrimmer>,
    ) -> Result<Self, SessionError> {
        std::fs::create_dir_all(&config.work_root)?;
        info!(work_root = %config.work_root.display(), "pipeline ready");
        Ok(Self {
            config,
            downloader,
            trimmer,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn open_session(&self) -> Result<Session, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let root = tempfile::Builder::new()
            .prefix(SESSION_DIR_PREFIX)
            .tempdir_in(&self.config.work_root)?;
        Ok(Session::new(id, root, self.downloader.clone(), self.trimmer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use media_downloader::stub::DownloaderStub;
    use media_downloader::{
        list_working_dirs, Downloader, FetchError, FetchRequest, MediaMetadata, Quality,
    };
    use media_primitives::ArtifactOrigin;
    use media_trimmer::stub::TrimmerStub;
    use media_trimmer::TrimError;
    use tempfile::TempDir;
    use time_primitives::{MediaTime, TimeError};
    use tokio_util::sync::CancellationToken;
    use url::Url;

    struct Harness {
        _work: TempDir,
        pipeline: ClipPipeline,
        trimmer: Arc<TrimmerStub>,
    }

    async fn harness_with(downloader: Arc<dyn Downloader>, trimmer: TrimmerStub) -> Harness {
        let work = TempDir::new().unwrap();
        let config = PipelineConfig {
            work_root: work.path().join("pipeline"),
            ..PipelineConfig::default()
        };
        let trimmer = Arc::new(trimmer);
        let pipeline = ClipPipeline::with_stages(
            config,
            Arc::new(MediaDownloader::new_with_downloader(downloader).await.unwrap()),
            Arc::new(MediaTrimmer::new_with_trimmer(trimmer.clone()).await.unwrap()),
        )
        .unwrap();
        Harness {
            _work: work,
            pipeline,
            trimmer,
        }
    }

    async fn harness() -> Harness {
        harness_with(Arc::new(DownloaderStub::new()), TrimmerStub::new()).await
    }

    fn request() -> FetchRequest {
        FetchRequest::new("https://example.com/watch?v=test", Quality::Best).unwrap()
    }

    fn secs(s: u64) -> MediaTime {
        MediaTime::from_secs(s)
    }

    fn working_dirs(session: &Session) -> Vec<PathBuf> {
        list_working_dirs(session.root()).unwrap()
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Downloads that only end when cancelled
    struct HangingDownloader;

    #[async_trait]
    impl Downloader for HangingDownloader {
        async fn check_available(&self) -> Result<(), FetchError> {
            Ok(())
        }

        async fn fetch_metadata(
            &self,
            _url: &Url,
            _cancel: &CancellationToken,
        ) -> Result<MediaMetadata, FetchError> {
            Ok(MediaMetadata {
                title: "Slow Video".to_string(),
                uploader: None,
                duration: Some(60.0),
                webpage_url: None,
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
            tokio::fs::write(dir.join(format!("{}.mp4.part", stem)), b"partial").await?;
            cancel.cancelled().await;
            Err(process_runner_cancelled())
        }
    }

    fn process_runner_cancelled() -> FetchError {
        FetchError::Command(process_runner::CommandError::Cancelled {
            program: PathBuf::from("yt-dlp"),
        })
    }

    async fn wait_for_phase(session: &Session, phase: Phase) {
        while session.phase() != phase {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_fetch_then_trim() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();
        assert_eq!(session.phase(), Phase::Idle);

        let fetched = session.fetch(request()).await.unwrap();
        assert_eq!(fetched.origin(), ArtifactOrigin::Fetch);
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(working_dirs(&session).len(), 1);

        let clip = session.trim(secs(5), secs(15)).await.unwrap();
        assert_eq!(clip.origin(), ArtifactOrigin::Trim);
        assert_eq!(session.phase(), Phase::Done);
        assert!(clip.path().is_file());
        assert!(fetched.path().is_file());

        let encodes = h.trimmer.encodes();
        assert_eq!(encodes.len(), 1);
        assert_eq!(encodes[0].1.start(), secs(5));
        assert_eq!(encodes[0].1.end(), secs(15));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.title.as_deref(), Some("Test Video"));
        assert_eq!(snapshot.duration, Some(secs(30)));
        assert_eq!(snapshot.has_audio, Some(true));
        assert_eq!(snapshot.trimmed.as_ref(), Some(&clip));
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected_before_encoding() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();
        session.fetch(request()).await.unwrap();

        let result = session.trim(secs(20), secs(10)).await;

        assert_matches!(
            result,
            Err(SessionError::Trim(TrimError::InvalidRange(TimeError::EmptyRange { .. })))
        );
        assert!(h.trimmer.encodes().is_empty());
        assert_eq!(session.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_range_past_the_end_is_rejected() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();
        session.fetch(request()).await.unwrap();

        let result = session.trim(secs(20), secs(40)).await;

        assert_matches!(
            result,
            Err(SessionError::Trim(TrimError::InvalidRange(TimeError::ExceedsSource { .. })))
        );
        assert!(h.trimmer.encodes().is_empty());
    }

    #[tokio::test]
    async fn test_trim_needs_a_fetch() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();

        assert_matches!(session.trim(secs(0), secs(1)).await, Err(SessionError::NothingFetched));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_nothing_behind() {
        let h = harness_with(
            Arc::new(DownloaderStub::new().failing("ERROR: Video unavailable")),
            TrimmerStub::new(),
        )
        .await;
        let session = h.pipeline.open_session().unwrap();

        let result = session.fetch(request()).await;

        assert_matches!(result, Err(SessionError::Fetch(FetchError::ToolFailed(_))));
        assert_eq!(session.phase(), Phase::Error);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.settled_phase, Phase::Idle);
        assert!(snapshot.last_error.unwrap().contains("Video unavailable"));
        assert!(working_dirs(&session).is_empty());
    }

    #[tokio::test]
    async fn test_failed_trim_can_be_retried() {
        let h = harness_with(
            Arc::new(DownloaderStub::new()),
            TrimmerStub::new().failing_times("Conversion failed!", 1),
        )
        .await;
        let session = h.pipeline.open_session().unwrap();
        let fetched = session.fetch(request()).await.unwrap();
        let dir = fetched.path().parent().unwrap().to_path_buf();

        assert_matches!(
            session.trim(secs(5), secs(15)).await,
            Err(SessionError::Trim(TrimError::ProcessingFailed(_)))
        );
        assert_eq!(session.phase(), Phase::Error);
        assert_eq!(session.snapshot().settled_phase, Phase::Ready);
        assert_eq!(files_in(&dir), vec!["source.mp4"]);

        session.trim(secs(5), secs(15)).await.unwrap();
        assert_eq!(session.phase(), Phase::Done);
        assert_eq!(files_in(&dir), vec!["clip_5000-15000.mp4", "source.mp4"]);
    }

    #[tokio::test]
    async fn test_second_fetch_replaces_first() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();

        let first = session.fetch(request()).await.unwrap();
        let clip = session.trim(secs(1), secs(2)).await.unwrap();
        let second = session.fetch(request()).await.unwrap();

        assert_ne!(first.path(), second.path());
        assert!(!first.path().exists());
        assert!(!clip.path().exists());
        assert!(second.path().is_file());
        assert_eq!(working_dirs(&session).len(), 1);
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.artifact(ArtifactOrigin::Trim), None);
    }

    #[tokio::test]
    async fn test_reset_releases_everything() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();
        session.fetch(request()).await.unwrap();
        session.trim(secs(5), secs(15)).await.unwrap();

        session.reset();

        assert_eq!(session.phase(), Phase::Idle);
        assert!(working_dirs(&session).is_empty());
        assert_eq!(session.artifact(ArtifactOrigin::Fetch), None);
        assert_eq!(session.artifact(ArtifactOrigin::Trim), None);
        assert!(!session.cancel());
    }

    #[tokio::test]
    async fn test_trim_again_from_done() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();
        session.fetch(request()).await.unwrap();

        let first = session.trim(secs(5), secs(15)).await.unwrap();
        let second = session.trim(secs(0), secs(10)).await.unwrap();

        assert!(!first.path().exists());
        assert!(second.path().is_file());
        assert_eq!(session.artifact(ArtifactOrigin::Trim), Some(second));
        assert_eq!(session.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_same_range_twice_keeps_the_clip() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();
        session.fetch(request()).await.unwrap();

        let first = session.trim(secs(5), secs(15)).await.unwrap();
        let second = session.trim(secs(5), secs(15)).await.unwrap();

        assert_eq!(first.path(), second.path());
        assert!(second.path().is_file());
    }

    #[tokio::test]
    async fn test_export_uses_download_name() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();
        let out = TempDir::new().unwrap();

        assert_matches!(
            session.export(ArtifactOrigin::Trim, out.path()).await,
            Err(SessionError::NoArtifact(ArtifactOrigin::Trim))
        );

        session.fetch(request()).await.unwrap();
        session.trim(secs(5), secs(15)).await.unwrap();

        let exported = session.export(ArtifactOrigin::Trim, out.path()).await.unwrap();
        assert_eq!(exported, out.path().join("cropped_Test Video.mp4"));
        assert!(exported.is_file());
        assert!(session.open(ArtifactOrigin::Fetch).await.is_ok());
    }

    #[tokio::test]
    async fn test_busy_session_rejects_work_until_cancelled() {
        let h = harness_with(Arc::new(HangingDownloader), TrimmerStub::new()).await;
        let session = Arc::new(h.pipeline.open_session().unwrap());

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.fetch(request()).await }
        });
        wait_for_phase(&session, Phase::Fetching).await;

        assert_matches!(session.fetch(request()).await, Err(SessionError::Busy(Phase::Fetching)));
        assert_matches!(session.trim(secs(0), secs(1)).await, Err(SessionError::Busy(Phase::Fetching)));

        assert!(session.cancel());
        let result = running.await.unwrap();

        assert!(result.as_ref().err().map(SessionError::is_cancelled).unwrap_or(false));
        assert_eq!(session.phase(), Phase::Error);
        assert_eq!(session.snapshot().settled_phase, Phase::Idle);
        assert!(working_dirs(&session).is_empty());
    }

    #[tokio::test]
    async fn test_reset_during_fetch_supersedes_it() {
        let h = harness_with(Arc::new(HangingDownloader), TrimmerStub::new()).await;
        let session = Arc::new(h.pipeline.open_session().unwrap());

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.fetch(request()).await }
        });
        wait_for_phase(&session, Phase::Fetching).await;

        session.reset();
        let result = running.await.unwrap();

        assert_matches!(result, Err(SessionError::Superseded("fetch")));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.snapshot().last_error, None);
        assert!(working_dirs(&session).is_empty());
    }

    #[tokio::test]
    async fn test_dropping_session_removes_its_root() {
        let h = harness().await;
        let session = h.pipeline.open_session().unwrap();
        session.fetch(request()).await.unwrap();
        let root = session.root().to_path_buf();
        assert!(root
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SESSION_DIR_PREFIX));

        drop(session);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let h = harness().await;
        let first = h.pipeline.open_session().unwrap();
        let second = h.pipeline.open_session().unwrap();
        assert_ne!(first.id(), second.id());
        assert_ne!(first.root(), second.root());

        first.fetch(request()).await.unwrap();
        second.fetch(request()).await.unwrap();
        first.reset();

        assert!(working_dirs(&first).is_empty());
        assert_eq!(working_dirs(&second).len(), 1);
        assert_eq!(second.phase(), Phase::Ready);
    }
}
