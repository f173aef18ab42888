// components/media_trimmer/src/stub.rs
//! In-process [`Trimmer`] that copies bytes instead of encoding and
//! remembers what it "encoded" so probes of its outputs answer consistently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use process_runner::CommandError;
use time_primitives::{MediaTime, TimeRange};
use tokio_util::sync::CancellationToken;

use crate::types::{MediaInfo, TrimError, Trimmer};

pub struct TrimmerStub {
    source_info: MediaInfo,
    failure: Option<String>,
    failures_left: Mutex<usize>,
    drop_audio: bool,
    outputs: Mutex<HashMap<PathBuf, MediaInfo>>,
    encodes: Mutex<Vec<(PathBuf, TimeRange)>>,
}

impl Default for TrimmerStub {
    fn default() -> Self {
        Self {
            source_info: MediaInfo {
                duration: Some(MediaTime::from_secs(30)),
                has_video: true,
                has_audio: true,
            },
            failure: None,
            failures_left: Mutex::new(0),
            drop_audio: false,
            outputs: Mutex::new(HashMap::new()),
            encodes: Mutex::new(Vec::new()),
        }
    }
}

impl TrimmerStub {
    pub fn new() -> Self {
        Self::default()
    }

    /// What probing any file not produced by this stub reports
    pub fn with_source_info(mut self, info: MediaInfo) -> Self {
        self.source_info = info;
        self
    }

    /// Encodes write a partial output and then fail with `stderr`
    pub fn failing(self, stderr: impl Into<String>) -> Self {
        self.failing_times(stderr, usize::MAX)
    }

    /// Like [`TrimmerStub::failing`], for the first `times` encodes only
    pub fn failing_times(mut self, stderr: impl Into<String>, times: usize) -> Self {
        self.failure = Some(stderr.into());
        self.failures_left = Mutex::new(times);
        self
    }

    /// Encoded outputs lose their audio track
    pub fn dropping_audio(mut self) -> Self {
        self.drop_audio = true;
        self
    }

    pub fn encodes(&self) -> Vec<(PathBuf, TimeRange)> {
        self.encodes.lock().clone()
    }
}

#[async_trait]
impl Trimmer for TrimmerStub {
    async fn check_available(&self) -> Result<(), TrimError> {
        Ok(())
    }

    async fn probe(&self, path: &Path, _cancel: &CancellationToken) -> Result<MediaInfo, TrimError> {
        if !path.is_file() {
            return Err(TrimError::ProcessingFailed(format!(
                "{}: No such file or directory",
                path.display()
            )));
        }
        let recorded = self.outputs.lock().get(path).copied();
        Ok(recorded.unwrap_or(self.source_info))
    }

    async fn encode(
        &self,
        source: &Path,
        range: TimeRange,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TrimError> {
        self.encodes.lock().push((source.to_path_buf(), range));
        let bytes = tokio::fs::read(source).await?;
        tokio::fs::write(output, &bytes[..bytes.len() / 2]).await?;

        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled {
                program: PathBuf::from("ffmpeg"),
            }
            .into());
        }
        if let Some(stderr) = &self.failure {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(TrimError::ProcessingFailed(stderr.clone()));
            }
        }

        tokio::fs::write(output, &bytes).await?;
        self.outputs.lock().insert(
            output.to_path_buf(),
            MediaInfo {
                duration: Some(range.duration()),
                has_video: self.source_info.has_video,
                has_audio: self.source_info.has_audio && !self.drop_audio,
            },
        );
        Ok(())
    }
}
