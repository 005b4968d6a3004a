mod cli;
mod commands;
mod error;
mod logging;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use fra_core::{Clock, HttpReleaseFetcher, JsonFileStore, SystemClock, UpdateResolver};
use fra_platform::AppPaths;
use log::error;

use crate::cli::Cli;
use crate::commands::{Context, run};
use crate::error::AppError;
use crate::settings::UpdaterSettings;

async fn execute(cli: Cli) -> Result<serde_json::Value, AppError> {
    let paths = AppPaths::new()?;
    paths
        .ensure_dirs()
        .map_err(|e| AppError::io("create application directories", e))?;
    let settings_path = cli.settings.clone().unwrap_or_else(|| paths.settings_file());
    let settings = UpdaterSettings::load_from_path(&settings_path)?;

    logging::init_logging(
        &paths.log_file(),
        settings.debug_logging,
        settings.max_log_size_bytes,
    );

    let source = settings.source_config()?;
    let identity = settings.identity();
    let current_version = cli
        .current_version
        .clone()
        .unwrap_or_else(|| settings.current_version.clone());

    let client = reqwest::Client::builder()
        .timeout(fra_core::FETCH_TIMEOUT)
        .build()
        .map_err(AppError::HttpClient)?;
    let fetcher = HttpReleaseFetcher::new(client).with_api_base(settings.github_api_base.clone());
    let store = JsonFileStore::new(paths.store_dir());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let resolver = UpdateResolver::new(Arc::new(fetcher), Arc::new(store), clock.clone());

    let ctx = Context {
        settings,
        settings_path,
        source,
        identity,
        current_version,
        resolver,
        clock,
    };
    run(cli.command, &ctx).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("fra-updater: failed to encode output: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("{e}");
            eprintln!("fra-updater: {e}");
            ExitCode::FAILURE
        }
    }
}
