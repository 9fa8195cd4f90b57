//! Deduplicating dirty queue.
//!
//! The queue is a set of component ids awaiting re-evaluation plus a
//! single-permit wake signal. Enqueuing an id already in the set is a no-op,
//! and any number of enqueues between two dequeues produce at most one
//! stored wake-up; the set itself is always re-checked after a wake, so
//! coalesced signals never lose work.
//!
//! Dequeue order is deliberately arbitrary: evaluation always reads live
//! dependency exports rather than state captured at enqueue time, so any
//! order converges to the same fixed point; only the path differs.

use super::error::ShutdownError;
use crate::component::ComponentId;
use parking_lot::Mutex;
use std::collections::HashSet;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Coalescing set of components awaiting re-evaluation.
#[derive(Debug, Default)]
pub struct DirtyQueue {
    dirty: Mutex<HashSet<ComponentId>>,
    wake: Notify,
}

impl DirtyQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` dirty.
    ///
    /// Returns `true` when the id was newly added, `false` when it was
    /// already pending. Always signals the wake channel; `Notify` stores at
    /// most one permit, so redundant signals coalesce.
    pub fn enqueue(&self, id: ComponentId) -> bool {
        let inserted = self.dirty.lock().insert(id);
        self.wake.notify_one();
        inserted
    }

    /// Removes and returns one arbitrary pending id, blocking while the set
    /// is empty.
    ///
    /// Fails with [`ShutdownError`] when `shutdown` fires while waiting.
    /// A non-empty set is drained without consulting the token first, so
    /// pending work wins over a concurrent shutdown on the fast path;
    /// once the caller is actually waiting, cancellation takes precedence
    /// over a racing wake-up.
    pub async fn dequeue(&self, shutdown: &CancellationToken) -> Result<ComponentId, ShutdownError> {
        if let Some(id) = self.take_any() {
            return Ok(id);
        }

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => return Err(ShutdownError),

                _ = self.wake.notified() => {
                    // One wake may stand in for several enqueues; the set is
                    // the source of truth.
                    if let Some(id) = self.take_any() {
                        return Ok(id);
                    }
                }
            }
        }
    }

    /// Removes `id` from the set if pending.
    ///
    /// Returns whether the id was pending. Used by the evaluation loop to
    /// detect re-dirtying that happened while an evaluation was in flight.
    pub fn remove(&self, id: &ComponentId) -> bool {
        self.dirty.lock().remove(id)
    }

    /// Returns whether `id` is currently pending.
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.dirty.lock().contains(id)
    }

    /// Number of pending ids.
    pub fn len(&self) -> usize {
        self.dirty.lock().len()
    }

    /// Returns whether no ids are pending.
    pub fn is_empty(&self) -> bool {
        self.dirty.lock().is_empty()
    }

    fn take_any(&self) -> Option<ComponentId> {
        let mut dirty = self.dirty.lock();
        let id = dirty.iter().next().cloned()?;
        dirty.remove(&id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_enqueue_is_idempotent() {
        let queue = DirtyQueue::new();

        assert!(queue.enqueue(ComponentId::new("a")));
        assert!(!queue.enqueue(ComponentId::new("a")));
        assert!(!queue.enqueue(ComponentId::new("a")));

        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_enqueue_coalesces_to_one_wake() {
        let queue = DirtyQueue::new();
        let shutdown = CancellationToken::new();

        for _ in 0..5 {
            queue.enqueue(ComponentId::new("a"));
        }

        let id = queue.dequeue(&shutdown).await.unwrap();
        assert_eq!(id, ComponentId::new("a"));
        assert!(queue.is_empty());

        // The coalesced wake permits at most one extra spin; with the set
        // drained the next dequeue must block rather than spin or return.
        let blocked = tokio::time::timeout(Duration::from_millis(50), queue.dequeue(&shutdown)).await;
        assert!(blocked.is_err(), "Dequeue on a drained queue should block");
    }

    #[tokio::test]
    async fn test_dequeue_returns_pending_id_immediately() {
        let queue = DirtyQueue::new();
        let shutdown = CancellationToken::new();

        queue.enqueue(ComponentId::new("a"));
        queue.enqueue(ComponentId::new("b"));

        let first = queue.dequeue(&shutdown).await.unwrap();
        let second = queue.dequeue(&shutdown).await.unwrap();

        let mut ids = vec![first.as_str().to_string(), second.as_str().to_string()];
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_dequeue_blocks_until_enqueue() {
        let queue = Arc::new(DirtyQueue::new());
        let shutdown = CancellationToken::new();

        let waiter = {
            let queue = Arc::clone(&queue);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { queue.dequeue(&shutdown).await })
        };

        // Give the waiter time to block.
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue(ComponentId::new("late"));

        let id = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap()
            .unwrap();
        assert_eq!(id, ComponentId::new("late"));
    }

    #[tokio::test]
    async fn test_cancelled_token_unblocks_dequeue() {
        let queue = Arc::new(DirtyQueue::new());
        let shutdown = CancellationToken::new();

        let waiter = {
            let queue = Arc::clone(&queue);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { queue.dequeue(&shutdown).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be unblocked")
            .unwrap();
        assert_eq!(result, Err(ShutdownError));
    }

    #[tokio::test]
    async fn test_already_cancelled_token_fails_immediately_when_empty() {
        let queue = DirtyQueue::new();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result = queue.dequeue(&shutdown).await;
        assert_eq!(result, Err(ShutdownError));
    }

    #[tokio::test]
    async fn test_pending_id_is_drained_despite_cancellation() {
        let queue = DirtyQueue::new();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        queue.enqueue(ComponentId::new("a"));

        // Fast path: a non-empty set is drained without a cancellation check.
        let id = queue.dequeue(&shutdown).await.unwrap();
        assert_eq!(id, ComponentId::new("a"));

        // With the set empty, cancellation now wins.
        let result = queue.dequeue(&shutdown).await;
        assert_eq!(result, Err(ShutdownError));
    }

    #[tokio::test]
    async fn test_remove_reports_membership() {
        let queue = DirtyQueue::new();

        queue.enqueue(ComponentId::new("a"));
        assert!(queue.remove(&ComponentId::new("a")));
        assert!(!queue.remove(&ComponentId::new("a")));
        assert!(queue.is_empty());
    }
}
