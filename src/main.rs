use anyhow::Result;
use clap::Parser;
use intake_client::cli::{run, Cli};
use intake_client::EnvironmentConfig;
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("intake_client=info,aplica=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = EnvironmentConfig::load()?;

    info!("Application intake client");
    info!("Intake endpoint: {}", config.intake_url);
    info!(
        "Retry policy: {} retries, base {}ms, cap {}ms",
        config.retry.max_retries, config.retry.base_delay_ms, config.retry.max_delay_ms
    );
    if let Some(dataset) = &config.country_dataset_path {
        info!("Country dataset: {}", dataset.display());
    }

    run(cli, config).await
}
