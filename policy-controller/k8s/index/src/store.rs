use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use kyverno_policy_controller_core::PolicyType;
use kyverno_policy_controller_k8s_api::PolicyResource;
use parking_lot::RwLock;
use std::{collections::BTreeSet, sync::Arc};

/// Matches resources of every kind.
pub(crate) const WILDCARD_KIND: &str = "*";

/// A multi-key index from `(policy type, kind, namespace)` to the policies that apply.
///
/// Cluster-scoped entries use an empty namespace. Each policy is held once, under its key, and
/// every bucket references that key so that replacing or removing a policy touches exactly the
/// buckets it was placed into.
#[derive(Debug, Default)]
pub(crate) struct Store(RwLock<Inner>);

#[derive(Debug, Default)]
struct Inner {
    policies: HashMap<Arc<str>, Indexed>,
    by_type: HashMap<PolicyType, ByKind>,
}

type ByKind = HashMap<String, ByNs>;

// Policy keys in insertion order.
type ByNs = HashMap<String, Vec<Arc<str>>>;

#[derive(Debug)]
struct Indexed {
    policy: Arc<PolicyResource>,
    buckets: BTreeSet<Bucket>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Bucket {
    pub policy_type: PolicyType,
    pub kind: String,
    pub namespace: String,
}

// === impl Store ===

impl Store {
    /// Inserts or replaces the policy stored under `key`, returning the number of buckets it was
    /// placed into.
    pub(crate) fn set(&self, key: &str, policy: Arc<PolicyResource>) -> usize {
        // Compute buckets before taking the lock.
        let buckets = Bucket::for_policy(&policy);
        let count = buckets.len();

        let mut inner = self.0.write();
        inner.remove(key);
        let key = Arc::<str>::from(key);
        for Bucket {
            policy_type,
            kind,
            namespace,
        } in buckets.iter()
        {
            inner
                .by_type
                .entry(*policy_type)
                .or_default()
                .entry(kind.clone())
                .or_default()
                .entry(namespace.clone())
                .or_default()
                .push(key.clone());
        }
        inner.policies.insert(key, Indexed { policy, buckets });

        count
    }

    /// Removes the policy stored under `key`. Returns false if there was none.
    pub(crate) fn unset(&self, key: &str) -> bool {
        self.0.write().remove(key)
    }

    /// Returns the policies indexed under exactly this triple.
    pub(crate) fn get(
        &self,
        policy_type: PolicyType,
        kind: &str,
        namespace: &str,
    ) -> Vec<Arc<PolicyResource>> {
        let inner = self.0.read();
        inner
            .keys(policy_type, kind, namespace)
            .iter()
            .filter_map(|key| inner.policies.get(key).map(|i| i.policy.clone()))
            .collect()
    }

    /// Unions several buckets under a single read lock. Each policy is returned at most once,
    /// regardless of how many of the buckets hold it.
    pub(crate) fn union<'a>(
        &self,
        buckets: impl IntoIterator<Item = (PolicyType, &'a str, &'a str)>,
    ) -> Vec<Arc<PolicyResource>> {
        let inner = self.0.read();
        let mut seen = HashSet::new();
        let mut policies = Vec::new();
        for (policy_type, kind, namespace) in buckets {
            for key in inner.keys(policy_type, kind, namespace) {
                if !seen.insert(key.clone()) {
                    continue;
                }
                if let Some(indexed) = inner.policies.get(key) {
                    policies.push(indexed.policy.clone());
                }
            }
        }
        policies
    }

    pub(crate) fn len(&self) -> usize {
        self.0.read().policies.len()
    }

    pub(crate) fn count(&self, f: impl Fn(&PolicyResource) -> bool) -> usize {
        self.0
            .read()
            .policies
            .values()
            .filter(|i| f(&i.policy))
            .count()
    }
}

// === impl Inner ===

impl Inner {
    fn keys(&self, policy_type: PolicyType, kind: &str, namespace: &str) -> &[Arc<str>] {
        self.by_type
            .get(&policy_type)
            .and_then(|by_kind| by_kind.get(kind))
            .and_then(|by_ns| by_ns.get(namespace))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(Indexed { buckets, .. }) = self.policies.remove(key) else {
            return false;
        };

        for Bucket {
            policy_type,
            kind,
            namespace,
        } in buckets
        {
            let Some(by_kind) = self.by_type.get_mut(&policy_type) else {
                continue;
            };
            if let Some(by_ns) = by_kind.get_mut(&kind) {
                if let Some(keys) = by_ns.get_mut(&namespace) {
                    keys.retain(|k| &**k != key);
                    if keys.is_empty() {
                        by_ns.remove(&namespace);
                    }
                }
                if by_ns.is_empty() {
                    by_kind.remove(&kind);
                }
            }
            if by_kind.is_empty() {
                self.by_type.remove(&policy_type);
            }
        }

        true
    }
}

// === impl Bucket ===

impl Bucket {
    /// Classifies each of the policy's rules and places the policy under every kind the rule
    /// matches, in the policy's own namespace (empty for cluster policies).
    pub(crate) fn for_policy(policy: &PolicyResource) -> BTreeSet<Self> {
        let spec = policy.spec();
        let namespace = policy.namespace().unwrap_or_default();
        let validate = if spec.is_enforce_capable() {
            PolicyType::ValidateEnforce
        } else {
            PolicyType::ValidateAudit
        };

        let mut buckets = BTreeSet::new();
        for rule in &spec.rules {
            let mut types = Vec::with_capacity(2);
            if rule.has_mutate() {
                types.push(PolicyType::Mutate);
            }
            if rule.has_validate() {
                types.push(validate);
            }
            if rule.has_generate() {
                types.push(PolicyType::Generate);
            }
            if rule.has_verify_images() {
                types.push(PolicyType::VerifyImagesMutate);
                if rule.has_verify_image_checks() {
                    types.push(PolicyType::VerifyImagesValidate);
                }
            }

            for kind in rule.kinds().map(kind_of).filter(|k| !k.is_empty()) {
                for policy_type in &types {
                    buckets.insert(Bucket {
                        policy_type: *policy_type,
                        kind: kind.to_string(),
                        namespace: namespace.clone(),
                    });
                }
            }
        }
        buckets
    }
}

/// Strips any `group/version/` or `version/` qualifier from a kind.
pub(crate) fn kind_of(gvk: &str) -> &str {
    gvk.rsplit('/').next().unwrap_or(gvk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyverno_policy_controller_k8s_api::policy::{
        ClusterPolicy, FailureAction, FailureActionOverride, MatchResources, Policy,
        ResourceDescription, ResourceFilter, Rule, Spec,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rule(kinds: &[&str]) -> Rule {
        Rule {
            name: "rule".to_string(),
            match_resources: MatchResources {
                any: vec![ResourceFilter {
                    resources: ResourceDescription {
                        kinds: kinds.iter().map(|k| k.to_string()).collect(),
                    },
                }],
                ..Default::default()
            },
            ..Rule::default()
        }
    }

    fn bucket(policy_type: PolicyType, kind: &str, namespace: &str) -> Bucket {
        Bucket {
            policy_type,
            kind: kind.to_string(),
            namespace: namespace.to_string(),
        }
    }

    #[test]
    fn kind_of_strips_qualifiers() {
        assert_eq!(kind_of("Pod"), "Pod");
        assert_eq!(kind_of("v1/Pod"), "Pod");
        assert_eq!(kind_of("apps/v1/Deployment"), "Deployment");
        assert_eq!(kind_of("*"), "*");
    }

    #[test]
    fn classifies_rules() {
        let spec = Spec {
            validation_failure_action: FailureAction::Audit,
            rules: vec![
                Rule {
                    mutate: Some(json!({ "patchStrategicMerge": {} })),
                    ..rule(&["Pod"])
                },
                Rule {
                    validate: Some(json!({ "message": "m" })),
                    ..rule(&["Pod", "apps/v1/Deployment"])
                },
                Rule {
                    generate: Some(json!({ "kind": "NetworkPolicy" })),
                    ..rule(&["Namespace"])
                },
            ],
            ..Spec::default()
        };
        let policy = PolicyResource::from(ClusterPolicy::new("p", spec.into()));

        assert_eq!(
            Bucket::for_policy(&policy),
            [
                bucket(PolicyType::Mutate, "Pod", ""),
                bucket(PolicyType::ValidateAudit, "Deployment", ""),
                bucket(PolicyType::ValidateAudit, "Pod", ""),
                bucket(PolicyType::Generate, "Namespace", ""),
            ]
            .into_iter()
            .collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn enforce_override_indexes_as_enforce() {
        let spec = Spec {
            validation_failure_action: FailureAction::Audit,
            validation_failure_action_overrides: vec![FailureActionOverride {
                action: FailureAction::Enforce,
                namespaces: vec!["prod".to_string()],
            }],
            rules: vec![Rule {
                validate: Some(json!({ "message": "m" })),
                ..rule(&["*"])
            }],
            ..Spec::default()
        };
        let mut policy = Policy::new("p", spec.into());
        policy.metadata.namespace = Some("ns-0".to_string());
        let policy = PolicyResource::from(policy);

        assert_eq!(
            Bucket::for_policy(&policy),
            [bucket(PolicyType::ValidateEnforce, "*", "ns-0")]
                .into_iter()
                .collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn image_verification_types() {
        let spec = Spec {
            rules: vec![Rule {
                verify_images: vec![Default::default()],
                ..rule(&["Pod"])
            }],
            ..Spec::default()
        };
        let policy = PolicyResource::from(ClusterPolicy::new("p", spec.into()));
        assert_eq!(
            Bucket::for_policy(&policy),
            [
                bucket(PolicyType::VerifyImagesMutate, "Pod", ""),
                bucket(PolicyType::VerifyImagesValidate, "Pod", ""),
            ]
            .into_iter()
            .collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn set_get_unset() {
        let store = Store::default();
        let spec = Spec {
            rules: vec![Rule {
                mutate: Some(json!({ "patchesJson6902": "[]" })),
                ..rule(&["Pod", "Service"])
            }],
            ..Spec::default()
        };
        let policy = Arc::new(PolicyResource::from(ClusterPolicy::new("p", spec.into())));

        assert_eq!(store.set("p", policy.clone()), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(PolicyType::Mutate, "Pod", "").len(), 1);
        assert_eq!(store.get(PolicyType::Mutate, "Service", "").len(), 1);
        assert!(store.get(PolicyType::Mutate, "Pod", "default").is_empty());
        assert!(store.get(PolicyType::Generate, "Pod", "").is_empty());

        // Setting the same key again replaces the entry.
        assert_eq!(store.set("p", policy), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(PolicyType::Mutate, "Pod", "").len(), 1);

        assert!(store.unset("p"));
        assert!(!store.unset("p"));
        assert_eq!(store.len(), 0);
        assert!(store.get(PolicyType::Mutate, "Pod", "").is_empty());
        assert!(store.0.read().by_type.is_empty(), "empty buckets are pruned");
    }

    #[test]
    fn replacing_a_policy_moves_its_buckets() {
        let store = Store::default();
        let mk = |kind: &str| {
            let spec = Spec {
                rules: vec![Rule {
                    generate: Some(json!({ "kind": "ConfigMap" })),
                    ..rule(&[kind])
                }],
                ..Spec::default()
            };
            Arc::new(PolicyResource::from(ClusterPolicy::new("p", spec.into())))
        };

        store.set("p", mk("Namespace"));
        store.set("p", mk("Pod"));
        assert!(store.get(PolicyType::Generate, "Namespace", "").is_empty());
        assert_eq!(store.get(PolicyType::Generate, "Pod", "").len(), 1);
    }

    #[test]
    fn union_dedupes_by_key() {
        let store = Store::default();
        let spec = Spec {
            rules: vec![Rule {
                mutate: Some(json!({ "foreach": [] })),
                ..rule(&["Pod", "*"])
            }],
            ..Spec::default()
        };
        store.set(
            "p",
            Arc::new(PolicyResource::from(ClusterPolicy::new("p", spec.into()))),
        );

        let policies = store.union([
            (PolicyType::Mutate, "Pod", ""),
            (PolicyType::Mutate, WILDCARD_KIND, ""),
        ]);
        assert_eq!(policies.len(), 1);
    }
}
