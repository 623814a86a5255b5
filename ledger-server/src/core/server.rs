//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::time::Duration;

use shared::util::now_millis;
use tokio::task::JoinHandle;

use crate::api;
use crate::core::{Config, Result, ServerError, ServerState};
use crate::credit::SyncOrchestrator;

/// HTTP Server
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<()> {
        let state = ServerState::initialize(&self.config)?;
        let sweeper = spawn_overdue_sweep(state.sync.clone(), self.config.overdue_sweep_secs);

        let app = api::build_app().with_state(state);

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Config(format!("failed to bind {}: {}", addr, e)))?;
        tracing::info!(
            "ledger-server HTTP listening on {} (env: {})",
            addr,
            self.config.environment
        );

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(handle) = sweeper {
            handle.abort();
        }
        served?;

        tracing::info!("ledger-server stopped");
        Ok(())
    }
}

/// 周期性把已过到期日的待收台账落盘为逾期；间隔为 0 时不启动
fn spawn_overdue_sweep(sync: SyncOrchestrator, secs: u64) -> Option<JoinHandle<()>> {
    if secs == 0 {
        return None;
    }

    Some(tokio::spawn(async move {
        // 第一次 tick 立即触发，启动时先扫一遍
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        loop {
            ticker.tick().await;
            let sync = sync.clone();
            match tokio::task::spawn_blocking(move || sync.sweep_overdue(now_millis())).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Overdue sweep failed"),
                Err(e) => tracing::error!(error = %e, "Overdue sweep task panicked"),
            }
        }
    }))
}

/// Resolve on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
