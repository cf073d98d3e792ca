pub mod cluster_policy;
pub mod namespaced_policy;
pub mod spec;

pub use self::{
    cluster_policy::{ClusterPolicy, ClusterPolicySpec},
    namespaced_policy::{Policy, PolicySpec},
    spec::{
        FailureAction, FailureActionOverride, ImageVerification, MatchResources,
        ResourceDescription, ResourceFilter, Rule, Spec,
    },
};
use kube::ResourceExt;
use std::sync::Arc;

/// Either a cluster-wide `ClusterPolicy` or a namespaced `Policy`.
///
/// Both kinds share a [`Spec`]; they differ only in scope. A `ClusterPolicy` applies to resources in
/// every namespace (and to cluster-scoped resources), whereas a `Policy` only applies to resources
/// in its own namespace.
#[derive(Clone, Debug)]
pub enum PolicyResource {
    Cluster(ClusterPolicy),
    Namespaced(Policy),
}

// === impl PolicyResource ===

impl PolicyResource {
    #[inline]
    pub fn spec(&self) -> &Spec {
        match self {
            Self::Cluster(p) => &p.spec.inner,
            Self::Namespaced(p) => &p.spec.inner,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Cluster(p) => p.name_any(),
            Self::Namespaced(p) => p.name_any(),
        }
    }

    /// The namespace a namespaced policy is scoped to. Always `None` for cluster policies.
    pub fn namespace(&self) -> Option<String> {
        match self {
            Self::Cluster(_) => None,
            Self::Namespaced(p) => p.namespace(),
        }
    }

    #[inline]
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(self, Self::Cluster(_))
    }

    /// The identity under which the policy is cached: `name` for cluster policies and
    /// `namespace/name` for namespaced ones.
    pub fn key(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name()),
            None => self.name(),
        }
    }
}

impl From<ClusterPolicy> for PolicyResource {
    fn from(policy: ClusterPolicy) -> Self {
        Self::Cluster(policy)
    }
}

impl From<Policy> for PolicyResource {
    fn from(policy: Policy) -> Self {
        Self::Namespaced(policy)
    }
}

impl From<ClusterPolicy> for Arc<PolicyResource> {
    fn from(policy: ClusterPolicy) -> Self {
        Arc::new(policy.into())
    }
}

impl From<Policy> for Arc<PolicyResource> {
    fn from(policy: Policy) -> Self {
        Arc::new(policy.into())
    }
}
