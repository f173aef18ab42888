// components/clip_session/src/cleanup.rs
//! Best-effort removal of working files. A file that cannot be removed is a
//! leak confined to the session's temporary root, so failures are logged and
//! never returned.

use std::io::ErrorKind;

use media_downloader::FetchedMedia;
use media_primitives::WorkingArtifact;
use tracing::{debug, warn};

pub fn release_artifact(artifact: &WorkingArtifact) {
    let path = artifact.path();
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), origin = %artifact.origin(), "released artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to release artifact"),
    }
}

/// Remove a fetch's working directory, including anything trimmed into it
pub fn release_fetched(media: FetchedMedia) {
    media.dir.release();
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_primitives::ArtifactOrigin;
    use tempfile::TempDir;

    #[test]
    fn releasing_twice_is_harmless() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip_0-1000.mp4");
        std::fs::write(&path, b"clip").unwrap();
        let artifact = WorkingArtifact::from_path(&path, ArtifactOrigin::Trim).unwrap();

        release_artifact(&artifact);
        assert!(!path.exists());
        release_artifact(&artifact);
    }
}
