//! Federation node binary.
//!
//! Configuration comes from the TOML file named by `FC_CONFIG` (if any),
//! then `FC_*` environment overrides. Stops on Ctrl-C.

use anyhow::Result;
use node_runtime::{init_logging, NodeConfig, NodeRuntime};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting federation node");

    let config = match NodeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return Err(e.into());
        }
    };

    let node = NodeRuntime::build(config)?.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received");
    node.shutdown().await;
    Ok(())
}
