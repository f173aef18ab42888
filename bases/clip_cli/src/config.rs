// bases/clip_cli/src/config.rs
use std::path::PathBuf;

use clap::Parser;
use clip_session::{ConfigError, PipelineConfig};
use media_downloader::Quality;
use time_primitives::MediaTime;

/// Clip CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline: PipelineConfig,

    pub url: String,

    pub quality: Quality,

    /// Range to cut out of the fetched video, if any
    pub trim: Option<(MediaTime, MediaTime)>,

    /// Where finished artifacts are copied
    pub output_dir: PathBuf,

    /// Also export the full fetched video when trimming
    pub keep_source: bool,

    pub verbose: bool,
}

/// Fetch a video and optionally cut a clip out of it
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Page URL of the video to fetch
    pub url: String,

    /// Clip start (seconds, MM:SS or HH:MM:SS.mmm)
    #[arg(short, long, requires = "end")]
    pub start: Option<MediaTime>,

    /// Clip end, exclusive (seconds, MM:SS or HH:MM:SS.mmm)
    #[arg(short, long, requires = "start")]
    pub end: Option<MediaTime>,

    /// Maximum resolution: best, 1080p, 720p, 480p or 360p
    #[arg(short, long)]
    pub quality: Option<Quality>,

    /// Directory to copy finished files into
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Directory for temporary working files
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// JSON pipeline configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Download timeout in seconds (0 disables)
    #[arg(long)]
    pub fetch_timeout: Option<u64>,

    /// Encode timeout in seconds (0 disables)
    #[arg(long)]
    pub trim_timeout: Option<u64>,

    /// Path to the yt-dlp executable
    #[arg(long)]
    pub ytdlp: Option<PathBuf>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe executable
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,

    /// Also copy the full source video to the output directory
    #[arg(long)]
    pub keep_source: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Create configuration from CLI arguments
    ///
    /// Flags win over the config file, which wins over defaults.
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut pipeline = match &args.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(dir) = args.work_dir {
            pipeline.work_root = dir;
        }
        if let Some(secs) = args.fetch_timeout {
            pipeline.fetch_timeout_secs = secs;
        }
        if let Some(secs) = args.trim_timeout {
            pipeline.trim_timeout_secs = secs;
        }
        if let Some(program) = args.ytdlp {
            pipeline.ytdlp_program = program;
        }
        if let Some(program) = args.ffmpeg {
            pipeline.ffmpeg_program = program;
        }
        if let Some(program) = args.ffprobe {
            pipeline.ffprobe_program = program;
        }

        let quality = args.quality.unwrap_or(pipeline.default_quality);
        let trim = args.start.zip(args.end);

        Ok(Self {
            pipeline,
            url: args.url,
            quality,
            trim,
            output_dir: args.output_dir,
            keep_source: args.keep_source,
            verbose: args.verbose,
        })
    }
}
