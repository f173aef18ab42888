// bases/clip_cli/src/app.rs
use std::sync::Arc;

use clip_session::{ClipPipeline, Session, SessionError};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_downloader::FetchRequest;
use media_primitives::ArtifactOrigin;
use tracing::{debug, info};

use crate::config::Config;
use crate::output::OutputHandler;

pub struct App {
    config: Config,
    output: OutputHandler,
}

impl App {
    pub fn new(config: Config) -> Self {
        let output = OutputHandler::new(config.verbose);
        Self { config, output }
    }

    pub async fn run(&self) -> Result<()> {
        let request = FetchRequest::new(&self.config.url, self.config.quality)?;
        let pipeline = ClipPipeline::new(self.config.pipeline.clone()).await?;
        let session = Arc::new(pipeline.open_session()?);

        let interrupt = tokio::spawn({
            let session = session.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupted");
                    session.cancel();
                }
            }
        });

        let result = self.process(&session, request).await;
        interrupt.abort();
        session.reset();

        match result {
            Err(e) if e.is_cancelled() => Err(eyre!("cancelled, working files removed")),
            result => result.map_err(Into::into),
        }
    }

    async fn process(&self, session: &Session, request: FetchRequest) -> Result<(), SessionError> {
        self.output
            .print_fetch_start(request.source_url().as_str(), request.quality());
        session.fetch(request).await?;
        self.output.print_fetched(&session.snapshot());

        let Some((start, end)) = self.config.trim else {
            return self.export(session, ArtifactOrigin::Fetch).await;
        };

        self.output.print_trim_start(start, end);
        let clip = session.trim(start, end).await?;
        self.output.print_trimmed(&clip);

        if self.config.keep_source {
            self.export(session, ArtifactOrigin::Fetch).await?;
        }
        self.export(session, ArtifactOrigin::Trim).await
    }

    async fn export(&self, session: &Session, origin: ArtifactOrigin) -> Result<(), SessionError> {
        let path = session.export(origin, &self.config.output_dir).await?;
        debug!(origin = %origin, path = %path.display(), "exported artifact");
        self.output.print_exported(&path);
        Ok(())
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        self.output.print_error(error);
    }
}
