// components/clip_session/src/error.rs
use media_downloader::FetchError;
use media_primitives::ArtifactOrigin;
use media_trimmer::TrimError;
use thiserror::Error;

use crate::state::Phase;

/// Failures surfaced to whoever drives a session; each names the stage that failed
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is busy ({0}), wait for it to finish or cancel it")]
    Busy(Phase),

    #[error("nothing has been fetched yet")]
    NothingFetched,

    #[error("no {0} video is held by this session")]
    NoArtifact(ArtifactOrigin),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("trim failed: {0}")]
    Trim(#[from] TrimError),

    #[error("could not inspect fetched video: {0}")]
    Probe(#[source] TrimError),

    #[error("session was reset while the {0} was running")]
    Superseded(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            SessionError::Fetch(e) => e.is_cancelled(),
            SessionError::Trim(e) | SessionError::Probe(e) => e.is_cancelled(),
            SessionError::Superseded(_) => true,
            _ => false,
        }
    }
}
