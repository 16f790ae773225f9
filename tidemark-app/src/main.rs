use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tidemark_common::observability::{init_logging, LogConfig, LogFormat};
use tidemark_common::run_span;
use tidemark_config::{TidemarkConfig, TidemarkConfigLoader};
use tidemark_report::{popularity_report, tracking_report};
use tidemark_twitter::{TwitterApi, TwitterCredentials};
use tracing::{info, Instrument};

use cli::{Cli, Command};
mod cli;

const DEFAULT_CONFIG_FILE: &str = "tidemark.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // 1) Load config (env wins)
    let mut loader = TidemarkConfigLoader::new();
    match &args.config {
        Some(path) => loader = loader.with_file(path),
        // The default file is optional; attach it only when present.
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            loader = loader.with_file(DEFAULT_CONFIG_FILE);
        }
        None => {}
    }
    let cfg: TidemarkConfig = loader.load()?;

    let log_path = init_logging(LogConfig {
        app_name: "tidemark",
        log_dir: cfg.log.dir.as_ref().map(PathBuf::from),
        emit_stderr: cfg.log.stderr,
        format: LogFormat::parse(&cfg.log.format),
        default_filter: cfg.log.filter.clone(),
    })?;

    let credentials = TwitterCredentials::from_path(&cfg.credentials_file)?;
    let api = TwitterApi::new(&cfg.api.base_url, credentials)?
        .with_rate_limit_wait(cfg.api.wait_on_rate_limit)
        .with_timeout(Duration::from_secs(cfg.api.timeout_secs));

    info!(log_path = %log_path.display(), "tidemark starting");

    match args.command {
        Command::Report => {
            let summary = popularity_report(
                &api,
                Path::new(&cfg.reference_file),
                Path::new(&cfg.raw_output_file),
                Path::new(&cfg.summary_output_file),
            )
            .instrument(run_span("report"))
            .await?;
            info!(rows = summary.rows.len(), "report complete");
        }
        Command::Track => {
            let updated = tracking_report(&api, Path::new(&cfg.reference_file))
                .instrument(run_span("track"))
                .await?;
            info!(
                rows = updated.rows.len(),
                columns = updated.headers.len(),
                "track complete"
            );
        }
    }

    Ok(())
}
