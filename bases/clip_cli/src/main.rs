// bases/clip_cli/src/main.rs
mod app;
mod config;
mod output;

use app::App;
use clap::Parser;
use color_eyre::Result;
use config::{CliArgs, Config};

const DEFAULT_FILTER: &str =
    "clip_cli=info,clip_session=info,media_downloader=info,media_trimmer=info,process_runner=warn";
const VERBOSE_FILTER: &str =
    "clip_cli=debug,clip_session=debug,media_downloader=debug,media_trimmer=debug,process_runner=debug";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let default_filter = if args.verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_args(args)?;
    let app = App::new(config);

    if let Err(error) = app.run().await {
        app.print_error(&error);
        std::process::exit(1);
    }
    Ok(())
}
