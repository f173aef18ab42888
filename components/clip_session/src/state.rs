// components/clip_session/src/state.rs
use std::fmt;

use chrono::{DateTime, Utc};
use media_downloader::FetchedMedia;
use media_primitives::WorkingArtifact;
use media_trimmer::MediaInfo;
use serde::Serialize;
use time_primitives::MediaTime;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Fetching,
    Ready,
    Trimming,
    Done,
    /// The last operation failed; held artifacts are those of the phase before it
    Error,
}

impl Phase {
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Fetching | Phase::Trimming)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Fetching => "fetching",
            Phase::Ready => "ready",
            Phase::Trimming => "trimming",
            Phase::Done => "done",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// A fetch the session owns, with what probing it revealed
#[derive(Debug)]
pub(crate) struct HeldFetch {
    pub media: FetchedMedia,
    pub info: Option<MediaInfo>,
}

impl HeldFetch {
    /// Probed duration, else what the site reported
    pub fn duration(&self) -> Option<MediaTime> {
        self.info.and_then(|info| info.duration).or_else(|| {
            self.media
                .metadata
                .duration
                .and_then(|secs| MediaTime::from_secs_f64(secs).ok())
        })
    }
}

#[derive(Debug)]
pub(crate) struct SessionState {
    pub phase: Phase,
    pub fetched: Option<HeldFetch>,
    pub trimmed: Option<WorkingArtifact>,
    pub last_error: Option<String>,
    pub in_flight: Option<CancellationToken>,
    /// Bumped by every operation start and reset; a finishing operation only
    /// commits if the generation it started under is still current
    pub generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            fetched: None,
            trimmed: None,
            last_error: None,
            in_flight: None,
            generation: 0,
        }
    }

    /// The phase implied by what is held, ignoring failure and in-flight work
    pub fn settled_phase(&self) -> Phase {
        match (&self.fetched, &self.trimmed) {
            (Some(_), Some(_)) => Phase::Done,
            (Some(_), None) => Phase::Ready,
            _ => Phase::Idle,
        }
    }

    pub fn ensure_not_busy(&self) -> Result<(), SessionError> {
        if self.phase.is_busy() {
            return Err(SessionError::Busy(self.phase));
        }
        Ok(())
    }

    pub fn start(&mut self, phase: Phase) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        self.generation += 1;
        self.phase = phase;
        self.last_error = None;
        self.in_flight = Some(token.clone());
        (self.generation, token)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn succeed(&mut self) {
        self.in_flight = None;
        self.phase = self.settled_phase();
    }

    pub fn fail(&mut self, error: &SessionError) {
        self.in_flight = None;
        self.phase = Phase::Error;
        self.last_error = Some(error.to_string());
    }
}

/// Read-only view of a session for display and download surfaces
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: u64,
    pub phase: Phase,
    /// Where the session stands once the current failure or operation is disregarded
    pub settled_phase: Phase,
    pub source_url: Option<String>,
    pub title: Option<String>,
    pub duration: Option<MediaTime>,
    pub has_audio: Option<bool>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub fetched: Option<WorkingArtifact>,
    pub trimmed: Option<WorkingArtifact>,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub(crate) fn capture(id: u64, state: &SessionState) -> Self {
        let held = state.fetched.as_ref();
        Self {
            id,
            phase: state.phase,
            settled_phase: state.settled_phase(),
            source_url: held.map(|h| h.media.request.source_url().to_string()),
            title: held.map(|h| h.media.metadata.title.clone()),
            duration: held.and_then(HeldFetch::duration),
            has_audio: held.and_then(|h| h.info).map(|info| info.has_audio),
            fetched_at: held.map(|h| h.media.fetched_at),
            fetched: held.map(|h| h.media.artifact.clone()),
            trimmed: state.trimmed.clone(),
            last_error: state.last_error.clone(),
        }
    }
}
