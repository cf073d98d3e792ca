use crate::{metrics::SizedIndex, SharedCache};
use kube::ResourceExt;
use kyverno_policy_controller_k8s_api::{ClusterPolicy, Policy, PolicyResource};
use parking_lot::RwLock;
use std::sync::Arc;

pub type SharedIndex = Arc<RwLock<PolicyIndex>>;

/// Applies `ClusterPolicy` and `Policy` watch events to a [`Cache`](crate::Cache).
///
/// Cluster policies are keyed by name, namespaced policies by `namespace/name`.
#[derive(Debug)]
pub struct PolicyIndex {
    cache: SharedCache,
}

// === impl PolicyIndex ===

impl PolicyIndex {
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }

    pub fn shared(cache: SharedCache) -> SharedIndex {
        Arc::new(RwLock::new(Self::new(cache)))
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }
}

impl kubert::index::IndexClusterResource<ClusterPolicy> for PolicyIndex {
    fn apply(&mut self, policy: ClusterPolicy) {
        let key = policy.name_unchecked();
        self.cache.set(key, policy);
    }

    fn delete(&mut self, name: String) {
        self.cache.unset(&name);
    }

    // Since apply only reindexes a single policy at a time, there's no need to handle resets
    // specially.
}

impl kubert::index::IndexNamespacedResource<Policy> for PolicyIndex {
    fn apply(&mut self, policy: Policy) {
        let name = policy.name_unchecked();
        let Some(namespace) = policy.namespace() else {
            tracing::warn!(%name, "Ignoring Policy without a namespace");
            return;
        };
        self.cache.set(format!("{namespace}/{name}"), policy);
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.cache.unset(&format!("{namespace}/{name}"));
    }
}

impl SizedIndex<ClusterPolicy> for PolicyIndex {
    fn size(&self) -> usize {
        self.cache.count(PolicyResource::is_cluster_scoped)
    }
}

impl SizedIndex<Policy> for PolicyIndex {
    fn size(&self) -> usize {
        self.cache.count(|p| !p.is_cluster_scoped())
    }
}
