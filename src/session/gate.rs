//! Per-mount gate around a protected page

use super::guard::{SessionGuard, SessionStatus};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

/// One protected-page mount.
///
/// Starts at [`SessionStatus::Checking`] and moves to exactly one terminal
/// state. Concurrent `resolve` calls share one resolution. Dropping the gate
/// (or the `resolve` future) before it resolves publishes nothing and never
/// navigates.
pub struct PageGate {
    guard: Arc<SessionGuard>,
    status: watch::Sender<SessionStatus>,
    resolved: OnceCell<SessionStatus>,
}

impl PageGate {
    pub fn new(guard: Arc<SessionGuard>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Checking);
        Self {
            guard,
            status,
            resolved: OnceCell::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Whether protected content may render
    pub fn can_render(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Watch status changes, e.g. to swap the loading indicator out
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Resolve this mount; later calls return the terminal state unchanged.
    pub async fn resolve(&self) -> SessionStatus {
        *self
            .resolved
            .get_or_init(|| async {
                let status = self.guard.check().await;
                self.status.send_replace(status);
                self.guard.react(status);
                status
            })
            .await
    }
}

impl SessionGuard {
    /// Open a gate for a page mount
    pub fn mount(self: &Arc<Self>) -> PageGate {
        PageGate::new(Arc::clone(self))
    }
}
