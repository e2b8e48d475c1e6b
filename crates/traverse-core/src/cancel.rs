//! Cooperative cancellation scopes.
//!
//! A [`CancelScope`] is a cheap, clonable handle. Cancelling a scope
//! cancels every child created from it, transitively; cancelling a child
//! leaves its parent alone. Work checks [`CancelScope::is_cancelled`] at
//! its own checkpoints. Nothing is interrupted mid-call, so a remote
//! request that is already in flight always completes and its result is
//! recorded before the task stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
    children: Mutex<Vec<Weak<Inner>>>,
    /// Keeps intermediate scopes alive while a descendant is.
    _parent: Option<Arc<Inner>>,
}

impl Inner {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_waiters();
        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

/// Handle to a node in the cancellation tree.
#[derive(Debug, Clone, Default)]
pub struct CancelScope {
    inner: Arc<Inner>,
}

impl CancelScope {
    /// Create a root scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope that is cancelled whenever `self` is.
    pub fn child(&self) -> Self {
        let child = Self {
            inner: Arc::new(Inner {
                _parent: Some(Arc::clone(&self.inner)),
                ..Inner::default()
            }),
        };
        {
            let mut children = self.inner.children.lock();
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        // Registered before the check, so a concurrent cancel cannot be missed.
        if self.is_cancelled() {
            child.cancel();
        }
        child
    }

    /// Cancel this scope and all of its descendants.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Whether this scope (or an ancestor) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolve once the scope is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the scope
    /// was cancelled.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => !self.is_cancelled(),
            () = self.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_cancels_children_transitively() {
        let root = CancelScope::new();
        let team = root.child();
        let scout = team.child();
        assert!(!scout.is_cancelled());
        root.cancel();
        assert!(team.is_cancelled());
        assert!(scout.is_cancelled());
    }

    #[test]
    fn child_cancel_leaves_parent_running() {
        let root = CancelScope::new();
        let a = root.child();
        let b = root.child();
        a.cancel();
        assert!(a.is_cancelled());
        assert!(!root.is_cancelled());
        assert!(!b.is_cancelled());
    }

    #[test]
    fn child_of_cancelled_scope_starts_cancelled() {
        let root = CancelScope::new();
        root.cancel();
        assert!(root.child().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_cut_short_by_cancel() {
        let scope = CancelScope::new();
        let sleeper = scope.clone();
        let handle = tokio::spawn(async move { sleeper.sleep(Duration::from_secs(3600)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        scope.cancel();
        assert_eq!(handle.await.ok(), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_when_not_cancelled() {
        let scope = CancelScope::new();
        assert!(scope.sleep(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn cancelled_resolves_for_descendant() {
        let root = CancelScope::new();
        let leaf = root.child().child();
        let waiter = tokio::spawn(async move { leaf.cancelled().await });
        root.cancel();
        assert!(waiter.await.is_ok());
    }
}
