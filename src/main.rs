use anyhow::{Context, Result};
use clap::Parser;
use fortune_backend::app::FortuneApp;
use fortune_backend::models::Config;
use fortune_backend::server;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "fortune-backend")]
#[command(about = "Serve photo-based daily fortunes")]
struct CliArgs {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind; hosting platforms usually provide `PORT`.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fortune_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fortune-backend");

    let args = CliArgs::parse();

    let config = Config::from_env().context("reading configuration")?;
    let app = match FortuneApp::new(config) {
        Ok(app) => Arc::new(app),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;

    server::serve(listener, app)
        .await
        .context("serving HTTP")?;
    Ok(())
}
