//! External rule-group storage boundary.
//!
//! The `rule_sync` component mirrors declared alerting rule groups into an
//! external rules API, namespaced per tenant. This module defines the client
//! contract and an in-memory implementation used by tests and local runs.
//!
//! Creating a group with an existing name replaces it; the store keeps at
//! most one group per (namespace, name) pair.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

// =============================================================================
// Rule Model
// =============================================================================

/// A single alerting rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Alert name.
    pub alert: String,
    /// Rule expression, opaque to the store.
    pub expr: String,
}

/// A named group of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    /// Group name, unique within a namespace.
    pub name: String,
    /// Rules in evaluation order.
    pub rules: Vec<Rule>,
}

// =============================================================================
// Store Contract
// =============================================================================

/// Error returned by rule store operations.
#[derive(Debug, Clone)]
pub struct RuleStoreError {
    message: String,
}

impl RuleStoreError {
    /// Creates a new store error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RuleStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RuleStoreError {}

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RuleStoreError>> + Send + 'a>>;

/// Client for an external rule-group API.
///
/// Implementations must be safe to share across evaluations; the controller
/// may call them from any evaluation of a `rule_sync` component.
pub trait RuleStore: Send + Sync + 'static {
    /// Creates or replaces a rule group in `namespace`.
    fn create_rule_group<'a>(&'a self, namespace: &'a str, group: RuleGroup) -> StoreFuture<'a, ()>;

    /// Deletes a rule group by name. Deleting a missing group is not an
    /// error.
    fn delete_rule_group<'a>(&'a self, namespace: &'a str, group: &'a str) -> StoreFuture<'a, ()>;

    /// Lists all rule groups in `namespace`.
    fn list_rule_groups<'a>(&'a self, namespace: &'a str) -> StoreFuture<'a, Vec<RuleGroup>>;
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// In-memory [`RuleStore`] keyed by namespace.
///
/// Used by tests and by local pipeline runs that have no external rules API
/// configured. Empty namespaces are removed so `namespaces()` reflects only
/// namespaces that actually hold groups.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    groups: DashMap<String, Vec<RuleGroup>>,
}

impl InMemoryRuleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the namespaces that currently hold at least one group.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> =
            self.groups.iter().map(|entry| entry.key().clone()).collect();
        namespaces.sort_unstable();
        namespaces
    }

    /// Returns the total number of groups across all namespaces.
    pub fn group_count(&self) -> usize {
        self.groups.iter().map(|entry| entry.value().len()).sum()
    }

    /// Returns the groups currently stored for `namespace`.
    ///
    /// Synchronous convenience for tests and status output.
    pub fn groups_in(&self, namespace: &str) -> Vec<RuleGroup> {
        self.groups
            .get(namespace)
            .map(|groups| groups.clone())
            .unwrap_or_default()
    }
}

impl RuleStore for InMemoryRuleStore {
    fn create_rule_group<'a>(&'a self, namespace: &'a str, group: RuleGroup) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut groups = self.groups.entry(namespace.to_string()).or_default();
            groups.retain(|existing| existing.name != group.name);
            groups.push(group);
            Ok(())
        })
    }

    fn delete_rule_group<'a>(&'a self, namespace: &'a str, group: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let emptied = match self.groups.get_mut(namespace) {
                Some(mut groups) => {
                    groups.retain(|existing| existing.name != group);
                    groups.is_empty()
                }
                None => false,
            };
            if emptied {
                self.groups.remove(namespace);
            }
            Ok(())
        })
    }

    fn list_rule_groups<'a>(&'a self, namespace: &'a str) -> StoreFuture<'a, Vec<RuleGroup>> {
        Box::pin(async move {
            Ok(self
                .groups
                .get(namespace)
                .map(|groups| groups.clone())
                .unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, rules: usize) -> RuleGroup {
        RuleGroup {
            name: name.to_string(),
            rules: (0..rules)
                .map(|i| Rule {
                    alert: format!("alert-{i}"),
                    expr: format!("expr-{i}"),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_replaces_same_name() {
        let store = InMemoryRuleStore::new();

        store.create_rule_group("ns", group("g", 1)).await.unwrap();
        store.create_rule_group("ns", group("g", 2)).await.unwrap();

        let groups = store.list_rule_groups("ns").await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rules.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_empty_namespace() {
        let store = InMemoryRuleStore::new();

        store.create_rule_group("ns", group("g", 1)).await.unwrap();
        assert_eq!(store.namespaces(), vec!["ns".to_string()]);

        store.delete_rule_group("ns", "g").await.unwrap();
        assert!(store.namespaces().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_group_is_not_an_error() {
        let store = InMemoryRuleStore::new();
        store.delete_rule_group("ns", "absent").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_namespace() {
        let store = InMemoryRuleStore::new();

        store.create_rule_group("a", group("g1", 1)).await.unwrap();
        store.create_rule_group("b", group("g2", 1)).await.unwrap();

        let groups = store.list_rule_groups("a").await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "g1");
        assert_eq!(store.group_count(), 2);
    }
}
