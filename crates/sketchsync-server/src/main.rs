//! SketchSync relay server binary.

use clap::Parser;
use sketchsync_server::{Relay, serve};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

#[derive(Parser)]
#[command(name = "sketchsync-server", about = "WebSocket relay for SketchSync sessions")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "SKETCHSYNC_ADDR", default_value = "0.0.0.0:8000")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchsync_server=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!("SketchSync relay server listening on {}", listener.local_addr()?);
    info!("WebSocket endpoint: ws://{}/ws/{{session}}", args.addr);

    serve(listener, Arc::new(Relay::new())).await?;
    Ok(())
}
