use anyhow::{Context, Result};
use grok_mcp::config::XaiConfig;
use grok_mcp::transport::{ServerStdioTransport, Transport};
use grok_mcp::xai::XaiClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grok_mcp=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    setup_tracing();

    let config = match XaiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Exit explicitly: a stdin read may still be parked on a blocking thread.
    match run(config).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("Server error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(config: XaiConfig) -> Result<()> {
    info!("Using xAI endpoint {}", config.base_url());
    let client = XaiClient::new(config).context("failed to build HTTP client")?;
    let server = grok_mcp::tools::server(&client);

    let transport = ServerStdioTransport::default();
    let shutdown = transport.clone();

    tokio::select! {
        served = server.serve(transport) => {
            served.context("MCP server stopped")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("Interrupted, closing transport");
            shutdown.close().await.context("failed to close transport")?;
        }
    }

    Ok(())
}
