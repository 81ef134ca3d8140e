//! Movelift deployment service daemon.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use movelift_core::{init_tracing, probe_toolchain, Config};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    let json = std::env::var("MOVELIFT_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    init_tracing(json, Level::INFO);

    let config = Config::from_env();
    let addr: SocketAddr = std::env::var("MOVELIFT_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()
        .context("invalid MOVELIFT_ADDR")?;

    let toolchain = probe_toolchain(&config.aptos_bin).await;
    match &toolchain.version {
        Some(version) => tracing::info!(%version, "toolchain found"),
        None => tracing::warn!(
            bin = %config.aptos_bin,
            "toolchain not found; deployments will fail until it is installed"
        ),
    }
    if config.private_key.is_none() {
        tracing::warn!("MOVELIFT_PRIVATE_KEY is not set; publishing is disabled");
    }

    movelift_server::serve(addr, config).await
}
