// bases/clip_cli/src/output.rs
use std::path::Path;

use clip_session::SessionSnapshot;
use media_downloader::Quality;
use media_primitives::WorkingArtifact;
use time_primitives::MediaTime;

pub struct OutputHandler {
    verbose: bool,
}

impl OutputHandler {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn print_fetch_start(&self, url: &str, quality: Quality) {
        println!("Fetching {} ({})", url, quality);
    }

    pub fn print_fetched(&self, snapshot: &SessionSnapshot) {
        if let Some(title) = &snapshot.title {
            println!("Fetched: {}", title);
        }
        if let Some(duration) = snapshot.duration {
            println!("Duration: {}", duration);
        }

        if self.verbose {
            if let Some(url) = &snapshot.source_url {
                println!("Source: {}", url);
            }
            if let Some(artifact) = &snapshot.fetched {
                println!("Working file: {}", artifact.path().display());
            }
            if let Some(fetched_at) = snapshot.fetched_at {
                println!("Fetch time: {}", fetched_at);
            }
        }
    }

    pub fn print_trim_start(&self, start: MediaTime, end: MediaTime) {
        println!("Trimming {} to {}", start, end);
    }

    pub fn print_trimmed(&self, clip: &WorkingArtifact) {
        if self.verbose {
            println!("Clip written to {}", clip.path().display());
        }
    }

    pub fn print_exported(&self, path: &Path) {
        println!("Saved: {}", path.display());
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        eprintln!("Error: {}", error);

        if self.verbose {
            eprintln!("\nError details:");
            error.chain().skip(1).for_each(|cause| {
                eprintln!("  caused by: {}", cause);
            });
        }
    }
}
