//! Exporter component that mirrors declared rule groups into an external
//! rule store.
//!
//! Each evaluation diffs the declared groups against the store's current
//! contents for the namespace: changed or new groups are written, groups no
//! longer declared are deleted. Removing the component from the graph
//! deletes everything it owns in its namespace.

use crate::component::{
    Component, ExportValue, RemoveFuture, UpdateContext, UpdateError, UpdateFuture,
};
use crate::rules::{RuleGroup, RuleStore};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Arguments {
    /// Namespace owning the declared groups.
    namespace: String,
    /// Desired rule groups for the namespace.
    #[serde(default)]
    groups: Vec<RuleGroup>,
}

/// Rule-group synchronization component.
pub struct RuleSync {
    store: Arc<dyn RuleStore>,
    /// Namespace written by the last successful update, cleaned on removal
    /// or when the declared namespace changes.
    active_namespace: Option<String>,
}

impl RuleSync {
    /// Creates a new instance backed by `store`.
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store,
            active_namespace: None,
        }
    }

    async fn clear_namespace(&self, namespace: &str) -> Result<(), UpdateError> {
        let existing = self
            .store
            .list_rule_groups(namespace)
            .await
            .map_err(|err| UpdateError::new(err.to_string()))?;
        for group in existing {
            self.store
                .delete_rule_group(namespace, &group.name)
                .await
                .map_err(|err| UpdateError::new(err.to_string()))?;
        }
        Ok(())
    }

    async fn sync(&self, namespace: &str, desired: &[RuleGroup]) -> Result<SyncStats, UpdateError> {
        let actual = self
            .store
            .list_rule_groups(namespace)
            .await
            .map_err(|err| UpdateError::new(err.to_string()))?;

        let mut stats = SyncStats::default();

        for group in desired {
            let unchanged = actual.iter().any(|existing| existing == group);
            if unchanged {
                continue;
            }
            self.store
                .create_rule_group(namespace, group.clone())
                .await
                .map_err(|err| UpdateError::new(err.to_string()))?;
            stats.written += 1;
        }

        for existing in &actual {
            let declared = desired.iter().any(|group| group.name == existing.name);
            if declared {
                continue;
            }
            self.store
                .delete_rule_group(namespace, &existing.name)
                .await
                .map_err(|err| UpdateError::new(err.to_string()))?;
            stats.deleted += 1;
        }

        Ok(stats)
    }
}

#[derive(Debug, Default)]
struct SyncStats {
    written: usize,
    deleted: usize,
}

impl Component for RuleSync {
    fn kind(&self) -> &str {
        "rule_sync"
    }

    fn update<'a>(&'a mut self, cx: UpdateContext) -> UpdateFuture<'a> {
        Box::pin(async move {
            let args: Arguments = serde_json::from_value(cx.arguments)
                .map_err(|err| UpdateError::new(format!("invalid arguments: {err}")))?;

            // A namespace change abandons the old namespace entirely.
            if let Some(previous) = self.active_namespace.as_deref() {
                if previous != args.namespace {
                    debug!(
                        old_namespace = previous,
                        new_namespace = %args.namespace,
                        "Namespace changed; clearing previously owned groups"
                    );
                    let previous = previous.to_string();
                    self.clear_namespace(&previous).await?;
                }
            }

            let stats = self.sync(&args.namespace, &args.groups).await?;
            self.active_namespace = Some(args.namespace.clone());

            debug!(
                namespace = %args.namespace,
                groups = args.groups.len(),
                written = stats.written,
                deleted = stats.deleted,
                "Rule groups synchronized"
            );

            Ok(json!({
                "namespace": args.namespace,
                "groups": args.groups.len(),
                "written": stats.written,
                "deleted": stats.deleted,
            }))
        })
    }

    fn on_remove<'a>(&'a mut self) -> RemoveFuture<'a> {
        Box::pin(async move {
            if let Some(namespace) = self.active_namespace.take() {
                debug!(namespace = %namespace, "Component removed; deleting owned rule groups");
                // Removal is best effort; the store may already be gone.
                let _ = self.clear_namespace(&namespace).await;
            }
        })
    }
}
