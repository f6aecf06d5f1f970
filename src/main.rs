use anyhow::Context;

use contact_archive::config::AppConfig;
use contact_archive::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("📇 Contact Archive v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Data dir: {}", config.data_dir.display());
    eprintln!(
        "   Archive: {} steps x {:?}",
        config.archive.steps, config.archive.step_delay
    );
    eprintln!("   Listening: http://0.0.0.0:{}/contacts\n", config.port);

    server::run(config).await.context("Server failed")?;
    Ok(())
}
