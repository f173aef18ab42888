// components/clip_session/src/session.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use media_downloader::{FetchRequest, MediaDownloader};
use media_primitives::{ArtifactOrigin, WorkingArtifact};
use media_trimmer::{MediaTrimmer, TrimError, TrimRequest};
use parking_lot::Mutex;
use tempfile::TempDir;
use time_primitives::{MediaTime, TimeRange};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cleanup::{release_artifact, release_fetched};
use crate::error::SessionError;
use crate::state::{HeldFetch, Phase, SessionSnapshot, SessionState};

/// One user's fetch → trim workflow and the files it owns.
///
/// All methods take `&self`; the session can be shared behind an `Arc` so a
/// caller may observe or cancel an operation while it runs. Dropping the
/// session removes its working root and everything in it.
pub struct Session {
    id: u64,
    downloader: Arc<MediaDownloader>,
    trimmer: Arc<MediaTrimmer>,
    state: Mutex<SessionState>,
    // declared last so held working directories are released before the root
    root: TempDir,
}

impl Session {
    pub(crate) fn new(
        id: u64,
        root: TempDir,
        downloader: Arc<MediaDownloader>,
        trimmer: Arc<MediaTrimmer>,
    ) -> Self {
        info!(session = id, root = %root.path().display(), "session opened");
        Self {
            id,
            downloader,
            trimmer,
            state: Mutex::new(SessionState::new()),
            root,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Directory holding every working directory of this session
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(self.id, &self.state.lock())
    }

    /// Fetch a video, replacing whatever the session held before.
    ///
    /// A held trimmed clip is released up front since it derives from the
    /// video being replaced. The previously fetched video stays usable until
    /// the new fetch succeeds.
    pub async fn fetch(&self, request: FetchRequest) -> Result<WorkingArtifact, SessionError> {
        let (generation, cancel, stale) = {
            let mut state = self.state.lock();
            state.ensure_not_busy()?;
            let stale = state.trimmed.take();
            let (generation, cancel) = state.start(Phase::Fetching);
            (generation, cancel, stale)
        };
        if let Some(stale) = stale {
            release_artifact(&stale);
        }
        info!(
            session = self.id,
            url = %request.source_url(),
            quality = %request.quality(),
            "fetch started"
        );

        let outcome = self.run_fetch(&request, &cancel).await;

        let mut state = self.state.lock();
        if !state.is_current(generation) {
            drop(state);
            if let Ok(held) = outcome {
                release_fetched(held.media);
            }
            return Err(SessionError::Superseded("fetch"));
        }

        match outcome {
            Ok(held) => {
                let artifact = held.media.artifact.clone();
                // the old video goes before the new one is recorded
                if let Some(previous) = state.fetched.take() {
                    release_fetched(previous.media);
                }
                state.fetched = Some(held);
                state.succeed();
                info!(session = self.id, path = %artifact.path().display(), "fetch finished");
                Ok(artifact)
            }
            Err(e) => {
                state.fail(&e);
                warn!(session = self.id, error = %e, "fetch failed");
                Err(e)
            }
        }
    }

    async fn run_fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<HeldFetch, SessionError> {
        let media = self.downloader.fetch(request, self.root.path(), cancel).await?;

        let info = match self.trimmer.probe(media.artifact.path(), cancel).await {
            Ok(info) => Some(info),
            Err(e) if e.is_cancelled() => {
                release_fetched(media);
                return Err(SessionError::Probe(e));
            }
            Err(e) => {
                warn!(session = self.id, error = %e, "could not probe fetched video, range checks use site metadata");
                None
            }
        };

        Ok(HeldFetch { media, info })
    }

    /// Cut `[start, end)` out of the fetched video.
    ///
    /// The range is validated against the known duration before any encoder
    /// runs. On failure the fetched video, and any earlier clip, stay held.
    pub async fn trim(&self, start: MediaTime, end: MediaTime) -> Result<WorkingArtifact, SessionError> {
        let (generation, cancel, request) = {
            let mut state = self.state.lock();
            state.ensure_not_busy()?;
            let held = state.fetched.as_ref().ok_or(SessionError::NothingFetched)?;
            TimeRange::within(start, end, held.duration()).map_err(TrimError::from)?;
            let request = TrimRequest::new(held.media.artifact.clone(), start, end, held.info)?;
            let (generation, cancel) = state.start(Phase::Trimming);
            (generation, cancel, request)
        };
        info!(session = self.id, range = %request.range(), "trim started");

        let outcome = self.trimmer.trim(&request, &cancel).await;

        let mut state = self.state.lock();
        if !state.is_current(generation) {
            drop(state);
            if let Ok(clip) = outcome {
                release_artifact(&clip);
            }
            return Err(SessionError::Superseded("trim"));
        }

        match outcome {
            Ok(clip) => {
                if let Some(previous) = state.trimmed.replace(clip.clone()) {
                    // trimming the same range again overwrote the previous clip in place
                    if previous.path() != clip.path() {
                        release_artifact(&previous);
                    }
                }
                state.succeed();
                info!(session = self.id, path = %clip.path().display(), "trim finished");
                Ok(clip)
            }
            Err(e) => {
                let e = SessionError::from(e);
                state.fail(&e);
                warn!(session = self.id, error = %e, "trim failed");
                Err(e)
            }
        }
    }

    /// Cancel the running fetch or trim, if any; returns whether there was one
    pub fn cancel(&self) -> bool {
        let state = self.state.lock();
        match &state.in_flight {
            Some(token) => {
                info!(session = self.id, phase = %state.phase, "cancelling");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Return to `Idle`, cancelling any running operation and releasing every held file
    pub fn reset(&self) {
        let (fetched, trimmed) = {
            let mut state = self.state.lock();
            if let Some(token) = state.in_flight.take() {
                token.cancel();
            }
            state.generation += 1;
            state.phase = Phase::Idle;
            state.last_error = None;
            (state.fetched.take(), state.trimmed.take())
        };

        if let Some(trimmed) = trimmed {
            release_artifact(&trimmed);
        }
        if let Some(fetched) = fetched {
            release_fetched(fetched.media);
        }
        info!(session = self.id, "session reset");
    }

    pub fn artifact(&self, origin: ArtifactOrigin) -> Option<WorkingArtifact> {
        let state = self.state.lock();
        match origin {
            ArtifactOrigin::Fetch => state.fetched.as_ref().map(|h| h.media.artifact.clone()),
            ArtifactOrigin::Trim => state.trimmed.clone(),
        }
    }

    /// File name to offer when handing the artifact to a user
    pub fn download_name(&self, origin: ArtifactOrigin) -> Option<String> {
        let state = self.state.lock();
        let title = state.fetched.as_ref().map(|h| h.media.metadata.title.as_str());
        let artifact = match origin {
            ArtifactOrigin::Fetch => state.fetched.as_ref().map(|h| &h.media.artifact),
            ArtifactOrigin::Trim => state.trimmed.as_ref(),
        };
        artifact.map(|artifact| artifact.download_name(title))
    }

    /// Open a held artifact for streaming its bytes
    pub async fn open(&self, origin: ArtifactOrigin) -> Result<tokio::fs::File, SessionError> {
        let artifact = self.artifact(origin).ok_or(SessionError::NoArtifact(origin))?;
        Ok(tokio::fs::File::open(artifact.path()).await?)
    }

    /// Copy a held artifact into `dest_dir` under its download name
    pub async fn export(&self, origin: ArtifactOrigin, dest_dir: &Path) -> Result<PathBuf, SessionError> {
        let artifact = self.artifact(origin).ok_or(SessionError::NoArtifact(origin))?;
        let name = self
            .download_name(origin)
            .ok_or(SessionError::NoArtifact(origin))?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(name);
        tokio::fs::copy(artifact.path(), &dest).await?;
        info!(session = self.id, origin = %origin, dest = %dest.display(), "exported");
        Ok(dest)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(token) = self.state.get_mut().in_flight.take() {
            token.cancel();
        }
    }
}
