//! Toolgate server - main entry point.
//!
//! Serves the REST, admin and WebSocket routes over HTTP and, unless
//! disabled, JSON-RPC over framed TCP. Runs until Ctrl-C.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use toolgate::executor::ToolExecutor;
use toolgate::gateway::{self, AppState, JsonRpcHandler, ServerInfo, ToolGateway};
use toolgate::ipc::IpcServer;
use toolgate::sync::RegistrySync;
use toolgate::tools::ToolRegistry;
use toolgate::Config;

#[derive(Debug, Parser)]
#[command(name = "toolgate", version, about = "Dynamic tool-invocation gateway")]
struct Cli {
    /// JSON config file; flags and env vars override its values.
    #[arg(long, env = "TOOLGATE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "TOOLGATE_HTTP_ADDR")]
    http_addr: Option<String>,

    #[arg(long, env = "TOOLGATE_IPC_ADDR")]
    ipc_addr: Option<String>,

    /// Disable the framed TCP transport.
    #[arg(long, env = "TOOLGATE_NO_IPC")]
    no_ipc: bool,

    /// SQLite database path; in-memory store when unset.
    #[arg(long, env = "TOOLGATE_DB")]
    db: Option<PathBuf>,

    #[arg(long, env = "TOOLGATE_REFRESH_INTERVAL_MS")]
    refresh_interval_ms: Option<u64>,

    #[arg(long, env = "TOOLGATE_DEFAULT_TIMEOUT_MS")]
    default_timeout_ms: Option<u64>,

    #[arg(long, env = "TOOLGATE_LOG_LEVEL")]
    log_level: Option<String>,

    #[arg(long, env = "TOOLGATE_JSON_LOGS")]
    json_logs: bool,
}

impl Cli {
    fn into_config(self) -> toolgate::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(addr) = self.http_addr {
            config.server.http_addr = addr;
        }
        if let Some(addr) = self.ipc_addr {
            config.server.ipc_addr = Some(addr);
        }
        if self.no_ipc {
            config.server.ipc_addr = None;
        }
        if let Some(path) = self.db {
            config.store.sqlite_path = Some(path);
        }
        if let Some(ms) = self.refresh_interval_ms {
            config.sync.refresh_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.default_timeout_ms {
            config.executor.default_timeout_ms = ms;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if self.json_logs {
            config.observability.json_logs = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    toolgate::observability::init_tracing(&config.observability);

    let cancel = CancellationToken::new();

    let store = toolgate::store::open(&config.store)?;
    let registry = Arc::new(ToolRegistry::new());
    let (sync, sync_task) =
        RegistrySync::new(store.clone(), registry.clone()).spawn(&config.sync, cancel.clone());

    // Serve even if the store is down; the scheduled ticks keep retrying.
    match sync.force_refresh().await {
        Ok(outcome) => tracing::info!("Initial registry load: {:?}", outcome),
        Err(e) => tracing::warn!("Initial registry load failed: {}", e),
    }

    let executor = ToolExecutor::new(config.executor.clone())?;
    let tool_gateway = Arc::new(ToolGateway::new(registry, executor));
    let rpc = Arc::new(JsonRpcHandler::new(
        tool_gateway.clone(),
        ServerInfo {
            name: config.server.name.clone(),
            version: config.server.version.clone(),
        },
    ));

    let state = Arc::new(AppState {
        gateway: tool_gateway,
        rpc: rpc.clone(),
        store,
        sync,
        outbound_capacity: config.ipc.outbound_capacity,
    });

    let listener = TcpListener::bind(&config.server.http_addr).await?;
    let http_task = tokio::spawn(gateway::serve_http(listener, state, cancel.clone()));

    let ipc_task = match &config.server.ipc_addr {
        Some(addr) => {
            let addr: SocketAddr = addr.parse()?;
            let server = IpcServer::new(rpc, addr, config.ipc.clone()).with_cancel(cancel.clone());
            Some(tokio::spawn(async move { server.serve().await }))
        }
        None => None,
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    cancel.cancel();

    if let Err(e) = http_task.await? {
        tracing::error!("HTTP server error: {}", e);
    }
    if let Some(task) = ipc_task {
        if let Err(e) = task.await? {
            tracing::error!("IPC server error: {}", e);
        }
    }
    sync_task.await?;

    Ok(())
}
