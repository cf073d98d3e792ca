use crate::store::{kind_of, Store, WILDCARD_KIND};
use kyverno_policy_controller_core::PolicyType;
use kyverno_policy_controller_k8s_api::{policy::FailureAction, PolicyResource};
use std::sync::Arc;

pub type SharedCache = Arc<Cache>;

/// Answers which policies apply to a resource of a given kind in a given namespace.
///
/// The cache is shared by reference between the watch tasks that update it and every admission
/// request that reads it.
#[derive(Debug, Default)]
pub struct Cache {
    store: Store,
}

// === impl Cache ===

impl Cache {
    pub fn shared() -> SharedCache {
        Arc::new(Self::default())
    }

    /// Inserts or replaces the policy stored under `key`.
    pub fn set(&self, key: impl AsRef<str>, policy: impl Into<Arc<PolicyResource>>) {
        let key = key.as_ref();
        let buckets = self.store.set(key, policy.into());
        if buckets == 0 {
            tracing::warn!(%key, "Policy has no rules that match any kind");
        } else {
            tracing::debug!(%key, buckets, "Indexed policy");
        }
    }

    /// Removes the policy stored under `key`, if any.
    pub fn unset(&self, key: &str) {
        if self.store.unset(key) {
            tracing::debug!(%key, "Removed policy");
        }
    }

    /// Returns every policy of `policy_type` that applies to a resource of `kind` in `namespace`.
    ///
    /// Cluster-wide policies for the exact kind and for the wildcard kind always apply; when a
    /// namespace is given, the policies scoped to that namespace apply as well. An audit query also
    /// considers the policies indexed for enforcement, since an override may downgrade them to
    /// audit in this namespace. Validation results are then narrowed to the policies whose
    /// effective failure action in `namespace` matches the query, so enforce and audit queries
    /// never both return a policy.
    ///
    /// An empty namespace denotes a cluster-scoped resource. Each policy appears at most once.
    pub fn get_policies(
        &self,
        policy_type: PolicyType,
        kind: &str,
        namespace: &str,
    ) -> Vec<Arc<PolicyResource>> {
        let kind = kind_of(kind);
        let types: &[PolicyType] = match policy_type {
            PolicyType::ValidateAudit => &[PolicyType::ValidateAudit, PolicyType::ValidateEnforce],
            _ => std::slice::from_ref(&policy_type),
        };

        let mut buckets = Vec::with_capacity(types.len() * 4);
        for &t in types {
            buckets.push((t, kind, ""));
            buckets.push((t, WILDCARD_KIND, ""));
            if !namespace.is_empty() {
                buckets.push((t, kind, namespace));
                buckets.push((t, WILDCARD_KIND, namespace));
            }
        }
        let candidates = self.store.union(buckets);

        let action = match policy_type {
            PolicyType::ValidateEnforce => FailureAction::Enforce,
            PolicyType::ValidateAudit => FailureAction::Audit,
            _ => return candidates,
        };
        candidates
            .into_iter()
            .filter(|p| p.spec().effective_action(namespace) == action)
            .collect()
    }

    /// Returns the policies indexed under exactly `(policy_type, kind, namespace)`, without the
    /// scope union or failure-action filtering applied by [`Cache::get_policies`].
    pub fn get(
        &self,
        policy_type: PolicyType,
        kind: &str,
        namespace: &str,
    ) -> Vec<Arc<PolicyResource>> {
        self.store.get(policy_type, kind_of(kind), namespace)
    }

    /// The number of cached policies.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn count(&self, f: impl Fn(&PolicyResource) -> bool) -> usize {
        self.store.count(f)
    }
}
