#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![allow(clippy::multiple_crate_versions)]

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use config::{Args, Settings};
use pipeline::{RefreshOutcome, refresh};
use tracing::{error, info};
use youtube::YouTubeClient;

pub mod config;
pub mod duration;
pub mod pipeline;
pub mod snapshot;
pub mod util;
pub mod youtube;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_args(Args::parse());
    info!("Starting YouTube video fetch");

    let api = match init_youtube_client(&settings) {
        Ok(api) => api,
        Err(e) => {
            error!("fatal: Failed to initialize YouTube client: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match refresh(&api, &settings).await {
        Ok(RefreshOutcome::NoChannels) => ExitCode::SUCCESS,
        Ok(RefreshOutcome::Written { videos }) => {
            info!("All done successfully! Published {videos} videos");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(
                "fatal: Failed to write to output file {}: {e:#}",
                settings.output_file.display()
            );
            ExitCode::FAILURE
        }
    }
}

fn init_youtube_client(settings: &Settings) -> Result<YouTubeClient> {
    let client = util::init_http_client()?;
    Ok(YouTubeClient::new(client, settings.api_key.as_deref())?
        .with_base_url(settings.api_base_url.as_str()))
}
