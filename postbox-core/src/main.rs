use anyhow::Result;
use postbox_core::{config::Config, server, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let metrics = telemetry::init(&config.telemetry);

    info!("Starting Postbox Core");
    info!("HTTP server listening on {}", config.http_addr());

    server::run(config, metrics).await
}
