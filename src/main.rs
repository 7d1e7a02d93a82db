mod background;
mod bot;
mod config;
mod db;
mod emoji;
mod error;
mod fuzzy;
mod scanners;
mod sheets;
mod tbl;
mod wisps;

use color_eyre::eyre::Result;
use tracing::instrument;
use tracing_subscriber::EnvFilter;

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::log_filter())),
        )
        .init();

    bot::run(&config::discord_token()?).await
}
