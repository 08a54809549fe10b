use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::ServiceConfig;

pub struct UsageServer {
    state: Arc<AppState>,
}

impl UsageServer {
    /// Create a server with the backend and identity resolver selected by `config`
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let state = AppState::from_config(config).context("Failed to initialize service state")?;
        Ok(Self::with_state(state))
    }

    /// Create a server around pre-built state, e.g. with a substituted backend
    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let config = &self.state.config;
        format!("{}:{}", config.host, config.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))
    }

    /// Serve until the process is stopped
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.listen_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!(
            addr = %addr,
            prefix = %self.state.config.service_prefix,
            backend = self.state.adapter.backend_name(),
            "usage-quota service listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server error")?;

        Ok(())
    }
}
