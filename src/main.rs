// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tadpole_spider::config::{Args, Settings};
use tadpole_spider::credentials::{ConsolePrompt, CredentialProvider, CredentialsFile};
use tadpole_spider::downloader::Downloader;
use tadpole_spider::navigator::{Navigator, Pacer};
use tadpole_spider::orchestrator::Orchestrator;
use tadpole_spider::session::SessionStore;
use tadpole_spider::spider::Spider;
use tadpole_spider::tagger::{ExifTool, NoopTagger, Tagger};

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(format!("warn,tadpole_spider={level}")),
    )
    .format_timestamp_secs()
    .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let settings = Settings::from_args(args);

    let credentials: Box<dyn CredentialProvider> = match &settings.credentials {
        Some(path) => Box::new(
            CredentialsFile::load(path, settings.login).context("Could not load credentials")?,
        ),
        None => Box::new(ConsolePrompt::new(settings.login)),
    };

    let tagger = match &settings.exiftool {
        Some(program) => Tagger::ExifTool(ExifTool::new(program)),
        None => Tagger::Noop(NoopTagger),
    };
    let pacer = Pacer::new(settings.min_sleep, settings.max_sleep);
    let downloader = Downloader::new(&settings.image_dir, pacer, tagger)
        .context("Could not build the download client")?;

    info!("Starting browser");
    let spider = Spider::launch(&settings)
        .await
        .context("Could not start the browser")?;

    let mut orchestrator = Orchestrator::new(
        Navigator::new(spider, pacer, settings.site.clone()),
        SessionStore::new(&settings.cookie_file),
        credentials,
        downloader,
    );

    let result = orchestrator.run().await;
    orchestrator.into_browser().close().await;

    match result {
        Ok(summary) => {
            info!(
                "Done: {} saved, {} already present, {} failed",
                summary.saved, summary.skipped, summary.failed
            );
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            Err(e).context("Crawl aborted")
        }
    }
}
