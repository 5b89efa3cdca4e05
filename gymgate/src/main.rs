use anyhow::Context;
use clap::Parser;
use tracing::info;

use gymgate::{
    config::{Args, Config},
    telemetry::init_telemetry,
    Application,
};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args).context("Failed to load configuration")?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    init_telemetry();

    let app = Application::new(config).await?;
    app.serve(shutdown_signal()).await
}
