//! # Depot Server Entry Point
//!
//! ## Usage
//! ```bash
//! depot-server                         # config from the platform config dir
//! depot-server --config ./depot.toml   # explicit config file
//! DEPOT_BACKEND=sqlite DEPOT_DB_PATH=./depot.db depot-server
//! ```

use std::path::PathBuf;

use depot_server::config::DepotConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    depot_server::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Depot WMS server");
                println!();
                println!("Usage: depot-server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>   TOML config file (default: platform config dir)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!("Starting Depot WMS server...");
    let config = DepotConfig::load(config_path)?;
    info!(
        backend = %config.store.backend,
        addr = %config.server.bind_address(),
        "Configuration loaded"
    );

    depot_server::run(config).await
}
