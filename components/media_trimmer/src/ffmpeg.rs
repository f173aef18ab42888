// components/media_trimmer/src/ffmpeg.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use process_runner::{CommandRunner, CommandSpec, SystemRunner};
use serde::Deserialize;
use time_primitives::{MediaTime, TimeRange};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::types::{MediaInfo, TrimError, Trimmer};

const STDERR_TAIL_LINES: usize = 5;

/// Fixed output encoding so clips play anywhere regardless of the source codecs
const VIDEO_CODEC: &str = "libx264";
const VIDEO_PRESET: &str = "veryfast";
const PIXEL_FORMAT: &str = "yuv420p";
const AUDIO_CODEC: &str = "aac";
const AUDIO_BITRATE: &str = "192k";

/// [`Trimmer`] backed by the `ffmpeg` and `ffprobe` command line tools
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    runner: Arc<dyn CommandRunner>,
    encode_timeout: Option<Duration>,
    probe_timeout: Option<Duration>,
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self::with_runner(ffmpeg, ffprobe, Arc::new(SystemRunner))
    }

    pub fn with_runner(
        ffmpeg: impl Into<PathBuf>,
        ffprobe: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            runner,
            encode_timeout: None,
            probe_timeout: None,
        }
    }

    pub fn encode_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.encode_timeout = timeout;
        self
    }

    pub fn probe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn probe_command(&self, path: &Path) -> CommandSpec {
        CommandSpec::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .timeout(self.probe_timeout)
    }

    pub fn encode_command(&self, source: &Path, range: TimeRange, output: &Path) -> CommandSpec {
        CommandSpec::new(&self.ffmpeg)
            .args(["-hide_banner", "-nostdin", "-y", "-loglevel", "error"])
            // input seeking; exact with re-encoding
            .arg("-ss")
            .arg(range.start().to_ffmpeg_arg())
            .arg("-i")
            .arg(source)
            .arg("-t")
            .arg(range.duration().to_ffmpeg_arg())
            .args(["-map", "0:v:0", "-map", "0:a:0?"])
            .args(["-c:v", VIDEO_CODEC, "-preset", VIDEO_PRESET, "-pix_fmt", PIXEL_FORMAT])
            .args(["-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE])
            .args(["-movflags", "+faststart", "-f", "mp4"])
            .arg(output)
            .timeout(self.encode_timeout)
    }
}

#[async_trait]
impl Trimmer for Ffmpeg {
    async fn check_available(&self) -> Result<(), TrimError> {
        for program in [&self.ffmpeg, &self.ffprobe] {
            process_runner::check_available(program)
                .map_err(|_| TrimError::DependencyNotFound(program.display().to_string()))?;
        }
        Ok(())
    }

    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<MediaInfo, TrimError> {
        debug!(path = %path.display(), "probing media");
        let output = self.runner.run(&self.probe_command(path), cancel).await?;
        if !output.success {
            return Err(TrimError::ProcessingFailed(format!(
                "ffprobe could not read {}: {}",
                path.display(),
                output.stderr_tail(STDERR_TAIL_LINES)
            )));
        }
        parse_probe(&output.stdout)
    }

    async fn encode(
        &self,
        source: &Path,
        range: TimeRange,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TrimError> {
        info!(source = %source.display(), %range, "encoding clip");
        let result = self
            .runner
            .run(&self.encode_command(source, range, output), cancel)
            .await?;
        if !result.success {
            return Err(TrimError::ProcessingFailed(result.stderr_tail(STDERR_TAIL_LINES)));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

fn parse_probe(stdout: &str) -> Result<MediaInfo, TrimError> {
    let probe: FfprobeOutput = serde_json::from_str(stdout)
        .map_err(|e| TrimError::ProcessingFailed(format!("unreadable ffprobe output: {}", e)))?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .and_then(|secs| MediaTime::from_secs_f64(secs).ok());

    // cover art shows up as a video stream; it is not a picture track
    let has_video = probe.streams.iter().any(|s| {
        s.codec_type.as_deref() == Some("video") && s.disposition.attached_pic == 0
    });
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        duration,
        has_video,
        has_audio,
    })
}
