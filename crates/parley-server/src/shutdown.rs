//! Graceful shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// One-shot shutdown latch shared between the signal handler and the
/// server's graceful-shutdown future.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownCoordinator {
    /// Create a coordinator in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger shutdown. Idempotent.
    pub fn shutdown(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether shutdown has been triggered.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown is triggered. Returns immediately if it
    /// already was.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_shutting_down() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn starts_running() {
        let coordinator = ShutdownCoordinator::new();
        assert!(!coordinator.is_shutting_down());
    }

    #[test]
    fn shutdown_sets_flag() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.shutdown();
        assert!(coordinator.is_shutting_down());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.shutdown();
        coordinator.shutdown();
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_triggered() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.shutdown();
        // must not hang
        tokio::time::timeout(Duration::from_secs(1), coordinator.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wait_resolves_on_trigger() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let waiter = coordinator.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        coordinator.shutdown();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
