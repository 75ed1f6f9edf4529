//! Vantage server: bootstraps [`vantage_core::Services`] with the
//! default local ports plus an externally configured LLM endpoint, and
//! serves the §6.1 RPC surface over HTTP/SSE.

mod config;
mod protocol;
mod server;
mod watch_manager;

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vantage_core::ports::default::HttpLlm;
use vantage_core::{EngineConfig, Services};

use crate::config::ServerArgs;
use crate::protocol::http::{HttpTransport, HttpTransportConfig};
use crate::server::VantageServer;
use crate::watch_manager::WatchManager;

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();

    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())).with_target(false).init();

    info!("vantage-server v{} starting", env!("CARGO_PKG_VERSION"));

    let data_dir = args.data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        error!("failed to create data directory {}: {e}", data_dir.display());
        std::process::exit(1);
    }

    let engine_config = EngineConfig::default();
    let llm = Arc::new(HttpLlm::new(args.llm_config()));

    let services = match Services::bootstrap(engine_config.clone(), &data_dir, llm) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("failed to bootstrap services: {e}");
            std::process::exit(1);
        }
    };

    let watch = Arc::new(WatchManager::new(engine_config.clone(), services.ingestion.clone()));
    if let Some(root) = &args.watch_root {
        match watch.add_path(root.clone()).await {
            Ok(()) => info!(root = %root.display(), "watching root from startup configuration"),
            Err(e) => warn!(root = %root.display(), error = %e, "failed to watch startup root"),
        }
    }

    let server = Arc::new(VantageServer::new(services, watch));
    let transport = HttpTransport::new(HttpTransportConfig { host: args.host.clone(), port: args.port });

    info!("serving RPC surface on {}:{}", args.host, args.port);
    if let Err(e) = transport.run(server).await {
        error!("server error: {e}");
        std::process::exit(1);
    }

    info!("vantage-server shut down");
}
