// components/media_downloader/src/locate.rs
use std::path::{Path, PathBuf};

use media_primitives::{ArtifactOrigin, ContainerKind, WorkingArtifact};
use tracing::{debug, warn};

use crate::types::LocateError;

/// Containers a fetch may produce
pub const DEFAULT_WHITELIST: &[ContainerKind] = &[ContainerKind::Mp4, ContainerKind::Mkv, ContainerKind::Webm];

/// File stem the downloader is told to use for its output
pub const OUTPUT_STEM: &str = "source";

/// Find the fetched media file in `dir`.
///
/// Only regular files with a whitelisted extension are candidates, so partial
/// downloads (`.part`) and sidecars (`.json`, `.vtt`) are skipped. With more
/// than one candidate the file named after [`OUTPUT_STEM`] wins, then the
/// lexicographically first name.
pub async fn locate(dir: &Path, whitelist: &[ContainerKind]) -> Result<WorkingArtifact, LocateError> {
    let io_error = |source| LocateError::Io {
        dir: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error)?;
    let mut candidates: Vec<(PathBuf, ContainerKind)> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let file_type = entry.file_type().await.map_err(io_error)?;
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        match ContainerKind::from_path(&path) {
            Ok(kind) if whitelist.contains(&kind) => candidates.push((path, kind)),
            _ => debug!(path = %path.display(), "skipping non-media file"),
        }
    }

    candidates.sort_by(|(a, _), (b, _)| {
        let a_is_output = has_output_stem(a);
        let b_is_output = has_output_stem(b);
        b_is_output.cmp(&a_is_output).then_with(|| a.cmp(b))
    });

    if candidates.len() > 1 {
        warn!(
            dir = %dir.display(),
            count = candidates.len(),
            chosen = %candidates[0].0.display(),
            "multiple media files found, choosing one"
        );
    }

    candidates
        .into_iter()
        .next()
        .map(|(path, kind)| WorkingArtifact::new(path, kind, ArtifactOrigin::Fetch))
        .ok_or_else(|| LocateError::NotFound {
            dir: dir.to_path_buf(),
        })
}

fn has_output_stem(path: &Path) -> bool {
    path.file_stem().map(|stem| stem == OUTPUT_STEM).unwrap_or(false)
}

/// Accept the path the tool reported if it is a whitelisted file inside `dir`
pub fn accept_reported(dir: &Path, reported: &Path, whitelist: &[ContainerKind]) -> Option<WorkingArtifact> {
    if reported.parent() != Some(dir) || !reported.is_file() {
        return None;
    }
    let kind = ContainerKind::from_path(reported).ok()?;
    whitelist
        .contains(&kind)
        .then(|| WorkingArtifact::new(reported, kind, ArtifactOrigin::Fetch))
}
