use anyhow::Result;
use clap::Parser;
use keyword_core::persist::DEFAULT_INDEX_DIR;
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// HTTP keyword search over a saved movie index.
#[derive(Parser)]
#[command(name = "server")]
struct Args {
    /// Index snapshot directory written by `keyword-search build`
    #[arg(long, default_value = DEFAULT_INDEX_DIR)]
    index: String,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig::from_env(&args.index);
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set; /index/reload will refuse every request");
    }
    let app = build_app(config);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index, "serving keyword search");
    axum::serve(listener, app).await?;
    Ok(())
}
