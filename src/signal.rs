//! Signal handling while running under the routing daemon.
//!
//! The daemon forwards Ctrl-C to its whole process group, so an attached
//! controller ignores SIGINT and only stops on SIGTERM or a shutdown request
//! from the peer. A detached run keeps the default dispositions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Cancellation shared between the signal task and the control loop.
#[derive(Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation and wake every waiter.
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Install the handlers appropriate for the run mode and return the token
/// SIGTERM will cancel.
///
/// Must be called from within a tokio runtime.
pub fn install(attached: bool) -> ShutdownToken {
    let token = ShutdownToken::new();
    if !attached {
        return token;
    }

    let sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Failed to register SIGINT handler: {}", e);
            None
        }
    };
    let sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            None
        }
    };

    let task_token = token.clone();
    tokio::spawn(async move {
        match (sigint, sigterm) {
            (Some(mut int), Some(mut term)) => loop {
                tokio::select! {
                    _ = int.recv() => {
                        debug!("Ignoring SIGINT while attached to the peer");
                    }
                    _ = term.recv() => {
                        info!("Received SIGTERM, shutting down...");
                        task_token.cancel();
                        break;
                    }
                }
            },
            (Some(mut int), None) => {
                while int.recv().await.is_some() {
                    debug!("Ignoring SIGINT while attached to the peer");
                }
            }
            (None, Some(mut term)) => {
                term.recv().await;
                info!("Received SIGTERM, shutting down...");
                task_token.cancel();
            }
            (None, None) => {
                warn!("No signal handlers registered");
            }
        }
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_token() {
        let token = ShutdownToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_shutdown_token_clone() {
        let token1 = ShutdownToken::new();
        let token2 = token1.clone();

        token1.cancel();

        assert!(token1.is_cancelled());
        assert!(token2.is_cancelled());
    }

    #[test]
    fn test_multiple_cancels() {
        let token = ShutdownToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_cancelled() {
        let token = ShutdownToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = ShutdownToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        tokio::task::yield_now().await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_detached_install_is_not_cancelled() {
        let token = install(false);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_attached_install_starts_uncancelled() {
        let token = install(true);
        assert!(!token.is_cancelled());
    }
}
