// components/media_downloader/src/workdir.rs
use std::path::Path;

use tempfile::TempDir;
use tracing::{debug, warn};

/// Uniquely named directory owning everything one fetch wrote.
///
/// Dropping it removes the directory; [`WorkingDir::release`] does the same
/// but reports failures through the log.
#[derive(Debug)]
pub struct WorkingDir {
    inner: TempDir,
}

impl WorkingDir {
    pub fn create_in(parent: impl AsRef<Path>, prefix: &str) -> std::io::Result<Self> {
        let inner = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent.as_ref())?;
        debug!(dir = %inner.path().display(), "created working directory");
        Ok(Self { inner })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Best-effort removal of the directory and its contents
    pub fn release(self) {
        let path = self.inner.path().to_path_buf();
        match self.inner.close() {
            Ok(()) => debug!(dir = %path.display(), "released working directory"),
            Err(e) => warn!(dir = %path.display(), error = %e, "failed to remove working directory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_unique_and_removed() {
        let parent = TempDir::new().unwrap();
        let first = WorkingDir::create_in(parent.path(), "fetch-").unwrap();
        let second = WorkingDir::create_in(parent.path(), "fetch-").unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("fetch-"));

        std::fs::write(first.path().join("source.mp4"), b"data").unwrap();
        let first_path = first.path().to_path_buf();
        first.release();
        assert!(!first_path.exists());

        let second_path = second.path().to_path_buf();
        drop(second);
        assert!(!second_path.exists());
    }
}
