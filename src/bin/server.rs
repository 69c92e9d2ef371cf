//! Cache server.
//!
//! Serves the process-wide memory segment over TCP for the network driver.

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use namespaced_cache::cli::ServerArgs;
use namespaced_cache::{segment, server};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = ServerArgs::parse();
    let segment = segment::init(args.segment_config());

    let addr = args.addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        max_capacity = args.max_capacity,
        default_ttl = args.default_ttl,
        "cache server listening"
    );

    server::serve(listener, segment.clone(), args.sweep_interval(), async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    })
    .await?;

    let stats = segment.stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        size = stats.size,
        evictions = stats.evictions,
        hit_rate = format_args!("{:.1}%", stats.hit_rate),
        "final stats"
    );
    Ok(())
}
