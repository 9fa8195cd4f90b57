//! Coordinated task group.
//!
//! A group of named long-running futures that start together and stop
//! together: the first task to finish (successfully or not) cancels every
//! peer through a shared token, and [`TaskGroup::run`] waits for all of them
//! before returning the first error. Used to tie the supervisor to its
//! sibling actors (signal handlers, periodic reporters) with one shutdown
//! discipline.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Error type tasks may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// First failure observed while running a group.
#[derive(Debug, Error)]
#[error("task `{name}` failed: {message}")]
pub struct GroupError {
    /// Name of the failed task.
    pub name: String,
    /// Failure description.
    pub message: String,
}

struct NamedTask {
    name: String,
    future: Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'static>>,
}

/// A set of tasks with interlocked lifetimes.
pub struct TaskGroup {
    cancel: CancellationToken,
    tasks: Vec<NamedTask>,
}

impl TaskGroup {
    /// Creates an empty group with its own cancellation token.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Creates a group whose token is a child of `parent`, so cancelling the
    /// parent stops the whole group.
    pub fn with_parent(parent: &CancellationToken) -> Self {
        Self {
            cancel: parent.child_token(),
            tasks: Vec::new(),
        }
    }

    /// Adds a named task.
    ///
    /// The closure receives a child token that fires when any peer finishes
    /// or the group is cancelled; tasks should select on it and return.
    pub fn add<F, Fut>(&mut self, name: &str, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let future = task(self.cancel.child_token());
        self.tasks.push(NamedTask {
            name: name.to_string(),
            future: Box::pin(future),
        });
    }

    /// Number of tasks added so far.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns whether no tasks have been added.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every task to completion.
    ///
    /// The first task to finish cancels the rest; `run` returns once all
    /// tasks have stopped, yielding the first failure (a task error or
    /// panic) if any occurred.
    pub async fn run(self) -> Result<(), GroupError> {
        let Self { cancel, tasks } = self;
        if tasks.is_empty() {
            return Ok(());
        }

        let mut names: HashMap<tokio::task::Id, String> = HashMap::new();
        let mut set = JoinSet::new();
        for task in tasks {
            let handle = set.spawn(task.future);
            names.insert(handle.id(), task.name);
        }

        let mut first_error: Option<GroupError> = None;
        while let Some(joined) = set.join_next_with_id().await {
            // Any completion interrupts the remaining peers.
            cancel.cancel();

            match joined {
                Ok((id, Ok(()))) => {
                    let name = names.remove(&id).unwrap_or_default();
                    debug!(task = %name, "Task completed");
                }
                Ok((id, Err(err))) => {
                    let name = names.remove(&id).unwrap_or_default();
                    warn!(task = %name, error = %err, "Task failed");
                    first_error.get_or_insert(GroupError {
                        name,
                        message: err.to_string(),
                    });
                }
                Err(join_err) => {
                    let name = names.remove(&join_err.id()).unwrap_or_default();
                    warn!(task = %name, error = %join_err, "Task aborted");
                    first_error.get_or_insert(GroupError {
                        name,
                        message: join_err.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_group_returns_ok() {
        assert!(TaskGroup::new().run().await.is_ok());
    }

    #[tokio::test]
    async fn test_first_exit_cancels_peers() {
        let peer_stopped = Arc::new(AtomicBool::new(false));

        let mut group = TaskGroup::new();
        group.add("short", |_cancel| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        });
        {
            let peer_stopped = Arc::clone(&peer_stopped);
            group.add("long", move |cancel| async move {
                cancel.cancelled().await;
                peer_stopped.store(true, Ordering::SeqCst);
                Ok(())
            });
        }

        tokio::time::timeout(Duration::from_secs(2), group.run())
            .await
            .expect("group should stop once the short task exits")
            .unwrap();
        assert!(peer_stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_first_failure_is_reported() {
        let mut group = TaskGroup::new();
        group.add("failing", |_cancel| async {
            Err::<(), BoxError>("broken pipe".into())
        });
        group.add("waiting", |cancel| async move {
            cancel.cancelled().await;
            Ok(())
        });

        let err = group.run().await.unwrap_err();
        assert_eq!(err.name, "failing");
        assert!(err.message.contains("broken pipe"));
    }

    #[tokio::test]
    async fn test_task_panic_is_surfaced() {
        let mut group = TaskGroup::new();
        group.add("panicking", |_cancel| async { panic!("boom") });
        group.add("waiting", |cancel| async move {
            cancel.cancelled().await;
            Ok(())
        });

        let err = group.run().await.unwrap_err();
        assert_eq!(err.name, "panicking");
    }

    #[tokio::test]
    async fn test_parent_cancellation_stops_group() {
        let parent = CancellationToken::new();
        let mut group = TaskGroup::with_parent(&parent);
        group.add("waiting", |cancel| async move {
            cancel.cancelled().await;
            Ok(())
        });

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(2), group.run())
            .await
            .expect("group should stop when the parent token fires")
            .unwrap();
    }
}
