//! # Depot Server Library
//!
//! HTTP API in front of depot-store. `main.rs` only parses arguments and
//! calls [`run`]; everything else lives here so tests can build the router
//! without a listener.
//!
//! ## Module Organization
//! ```text
//! depot_server/
//! ├── lib.rs          ◄─── You are here (startup & tracing)
//! ├── config.rs       ◄─── TOML + env configuration
//! ├── state.rs        ◄─── Shared handler state
//! ├── error.rs        ◄─── ApiError → HTTP status + JSON body
//! └── routes/
//!     ├── mod.rs      ◄─── Route table, collection dispatch
//!     ├── records.rs  ◄─── Generic CRUD
//!     ├── actions.rs  ◄─── Archive/restore and workflow actions
//!     ├── bulk.rs     ◄─── Bulk archive/restore/delete/status
//!     ├── ledger.rs   ◄─── Cash and bank balances
//!     ├── admin.rs    ◄─── Password check, migration pass
//!     └── changes.rs  ◄─── WebSocket change feed
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use anyhow::Context;
use depot_store::{BackendConfig, Warehouse};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::DepotConfig;
use state::AppState;

pub use routes::router;

/// Starts the server and blocks until a shutdown signal arrives.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Open the store the config names (memory snapshot or SQLite)         │
/// │  2. Run the migration pass over every collection (if enabled)           │
/// │  3. Bind the listener and serve until Ctrl+C / SIGTERM                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(config: DepotConfig) -> anyhow::Result<()> {
    let backend = config.backend_config();
    if let BackendConfig::Sqlite(db) = &backend {
        if let Some(parent) = db.database_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let warehouse = Warehouse::open(backend).await.context("opening store")?;

    if config.store.migrate_on_start {
        let report = warehouse.migrate_all().await.context("migrating documents")?;
        info!(rewritten = report.total, "Startup migration complete");
    }

    let addr = config.server.bind_address();
    let app = router(AppState::new(warehouse, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Depot server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=depot=trace` - Show trace for depot crates only
/// - Default: INFO, depot crates at DEBUG
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,depot=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
