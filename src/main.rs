mod app;
mod audio;
mod config;
mod error;
mod index;
mod input;
mod locator;
mod messages;
mod services;
mod view;

use app::App;
use config::Config;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting soundboard");

    let config = Config::load()?;
    config.validate()?;

    // LocalSet for !Send futures (capture and playback hold native audio streams)
    let local = tokio::task::LocalSet::new();

    local
        .run_until(async move {
            let app = App::new(&config).await?;
            tokio::task::spawn_local(view::present(app.subscribe()));
            app.run().await
        })
        .await
}
