//! Graceful shutdown handling for the Vigil server

use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_requested() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Stops components one at a time, each bounded by the same timeout
pub struct GracefulShutdown {
    component_timeout: Duration,
}

impl GracefulShutdown {
    pub fn new(component_timeout: Duration) -> Self {
        Self { component_timeout }
    }

    /// Run `stop` for `component`, returning false if it timed out
    pub async fn stop<F>(&self, component: &str, stop: F) -> bool
    where
        F: Future<Output = ()>,
    {
        info!("Stopping {}...", component);
        match tokio::time::timeout(self.component_timeout, stop).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    "{} did not stop within {:?}, abandoning it",
                    component, self.component_timeout
                );
                false
            }
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
