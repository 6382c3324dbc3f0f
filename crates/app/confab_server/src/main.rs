//! Confab API server binary.

use clap::Parser;
use tracing::{info, warn};

/// CLI arguments for the relay server.
#[derive(Parser, Debug)]
#[command(name = "confab_server", about = "Confab chat relay server")]
struct Args {
    /// Address to bind the HTTP listener.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3200")]
    bind_addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,confab_api=debug,confab_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let mut config = confab_api::config::ApiConfig::from_env();
    config.bind_addr = args.bind_addr;

    if config.api_key.is_none() {
        // The server still starts; every upstream-backed request will 500.
        warn!("OPENAI_API_KEY is not set, chat and share-view requests will fail");
    }

    info!(
        assistant_id = %config.assistant_id,
        notice_mode = %config.notice_mode,
        "starting confab_server"
    );

    let state = confab_api::AppState {
        config: config.clone(),
    };
    let app = confab_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
