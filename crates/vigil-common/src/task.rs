//! Shutdown signalling for background loops
//!
//! Loops wait on [`ShutdownSignal::cancelled`] only *between* cycles, so a
//! cycle that has already started always runs to completion.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shutdown flag shared between a background loop and its owner
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Trigger shutdown
    pub fn shutdown(&self) {
        self.sender.send_replace(true);
    }

    /// Check if shutdown has been triggered
    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once shutdown has been triggered (immediately if it already was)
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|stopped| *stopped).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A spawned loop together with the signal that stops it
pub struct BackgroundTask {
    name: String,
    signal: ShutdownSignal,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `body` on the current tokio runtime, handing it the shutdown signal.
    pub fn spawn<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let signal = ShutdownSignal::new();
        let handle = tokio::spawn(body(signal.clone()));
        info!("Background task '{}' started", name);
        Self {
            name,
            signal,
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop to stop and wait for its current cycle to finish.
    pub async fn shutdown(self) {
        self.signal.shutdown();
        if let Err(e) = self.handle.await {
            warn!("Background task '{}' ended abnormally: {}", self.name, e);
            return;
        }
        info!("Background task '{}' stopped", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_signal() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());

        signal.shutdown();
        assert!(signal.is_shutdown());

        // Already-triggered signals resolve immediately
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_background_task_stops_between_cycles() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let counter = cycles.clone();

        let task = BackgroundTask::spawn("counter", move |signal| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(5)) => {}
                }
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(task.name(), "counter");

        tokio::time::sleep(Duration::from_millis(30)).await;
        task.shutdown().await;

        let after_shutdown = cycles.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cycles.load(Ordering::SeqCst), after_shutdown);
    }
}
