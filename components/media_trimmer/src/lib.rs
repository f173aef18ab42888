// components/media_trimmer/src/lib.rs
//! Cuts a time range out of a fetched video and re-encodes it to MP4.
//!
//! Output is written next to the source under a `.part` name and renamed into
//! place once the encoder succeeded and the result checks out, so the final
//! path either holds a complete clip or does not exist.

mod ffmpeg;
mod types;
#[cfg(any(test, feature = "stub"))]
pub mod stub;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use media_primitives::{ArtifactOrigin, ContainerKind, WorkingArtifact};
use time_primitives::{MediaTime, TimeRange};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use ffmpeg::Ffmpeg;
pub use types::{MediaInfo, TrimError, TrimRequest, Trimmer};

/// Container every clip is encoded into
pub const OUTPUT_CONTAINER: ContainerKind = ContainerKind::Mp4;

const PARTIAL_SUFFIX: &str = ".part";

/// How far a clip's probed duration may drift from the requested range
pub const DURATION_TOLERANCE: MediaTime = MediaTime::from_millis(500);

pub struct MediaTrimmer {
    trimmer: Arc<dyn Trimmer>,
}

impl MediaTrimmer {
    /// Create a MediaTrimmer using the `ffmpeg`/`ffprobe` found on `PATH`
    pub async fn new() -> Result<Self, TrimError> {
        Self::new_with_trimmer(Arc::new(Ffmpeg::new("ffmpeg", "ffprobe"))).await
    }

    pub async fn new_with_trimmer(trimmer: Arc<dyn Trimmer>) -> Result<Self, TrimError> {
        trimmer.check_available().await?;
        Ok(Self { trimmer })
    }

    pub async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<MediaInfo, TrimError> {
        self.trimmer.probe(path, cancel).await
    }

    /// Produce a new artifact holding only the requested range of the source
    pub async fn trim(
        &self,
        request: &TrimRequest,
        cancel: &CancellationToken,
    ) -> Result<WorkingArtifact, TrimError> {
        let source = request.source().path();
        let output = output_path(source, request.range());
        if output == source {
            return Err(TrimError::ProcessingFailed(format!(
                "refusing to overwrite the source {}",
                source.display()
            )));
        }
        let partial = partial_path(&output);

        info!(
            source = %source.display(),
            range = %request.range(),
            output = %output.display(),
            "trimming"
        );

        if let Err(e) = self.encode_and_verify(request, &partial, cancel).await {
            discard(&partial).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&partial, &output).await {
            discard(&partial).await;
            return Err(e.into());
        }

        info!(output = %output.display(), "clip ready");
        Ok(WorkingArtifact::new(output, OUTPUT_CONTAINER, ArtifactOrigin::Trim))
    }

    async fn encode_and_verify(
        &self,
        request: &TrimRequest,
        partial: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TrimError> {
        self.trimmer
            .encode(request.source().path(), request.range(), partial, cancel)
            .await?;

        let written = match tokio::fs::metadata(partial).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        if written == 0 {
            return Err(TrimError::ProcessingFailed("encoder produced no output".to_string()));
        }

        let produced = self.trimmer.probe(partial, cancel).await?;
        debug!(duration = ?produced.duration, has_audio = produced.has_audio, "probed clip");

        let requested = request.range().duration();
        match produced.duration {
            Some(duration) if duration.as_millis().abs_diff(requested.as_millis()) > DURATION_TOLERANCE.as_millis() => {
                return Err(TrimError::ProcessingFailed(format!(
                    "clip is {} long, expected {}",
                    duration, requested
                )));
            }
            Some(_) => {}
            None => warn!(output = %partial.display(), "clip duration unknown, not checked"),
        }

        let source_has_audio = request.source_info().map(|info| info.has_audio);
        if source_has_audio == Some(true) && !produced.has_audio {
            return Err(TrimError::ProcessingFailed(
                "clip is missing the source's audio track".to_string(),
            ));
        }
        Ok(())
    }
}

/// `clip_<start_ms>-<end_ms>.mp4` next to the source
pub fn output_path(source: &Path, range: TimeRange) -> PathBuf {
    let name = format!(
        "clip_{}-{}.{}",
        range.start().as_millis(),
        range.end().as_millis(),
        OUTPUT_CONTAINER.extension()
    );
    match source.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn discard(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => debug!(path = %partial.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %partial.display(), error = %e, "failed to remove partial output"),
    }
}
