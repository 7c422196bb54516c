//! API server bootstrap.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::ApiState;

pub struct ApiServer {
    bind: SocketAddr,
    state: ApiState,
}

impl ApiServer {
    pub fn new(bind: SocketAddr, state: ApiState) -> Self {
        Self { bind, state }
    }

    /// Bind and serve until Ctrl-C. In-flight requests are allowed to finish.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("failed to bind {}", self.bind))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().context("listener has no local address")?;
        info!("API server listening on {}", addr);

        axum::serve(listener, build_router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("API server terminated")?;

        info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // Without a signal handler the server can only be killed.
            warn!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
