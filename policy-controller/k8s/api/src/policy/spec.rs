use crate::wildcard;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The body shared by `ClusterPolicy` and `Policy` resources.
///
/// Rule bodies (`mutate`, `validate`, ...) are carried opaquely: only their presence matters when
/// deciding which policies apply to a resource.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub validation_failure_action: FailureAction,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_failure_action_overrides: Vec<FailureActionOverride>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
}

/// Whether a failed validation blocks the request or is only reported.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FailureAction {
    #[serde(rename = "Enforce", alias = "enforce")]
    Enforce,

    #[default]
    #[serde(rename = "Audit", alias = "audit")]
    Audit,
}

/// Replaces a policy's default failure action for a set of namespaces.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FailureActionOverride {
    pub action: FailureAction,

    /// Namespace names or wildcard patterns (`*`, `?`).
    #[serde(default)]
    pub namespaces: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,

    #[serde(rename = "match", default)]
    pub match_resources: MatchResources,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutate: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_images: Vec<ImageVerification>,
}

/// Selects the resources a rule applies to.
///
/// `resources` is the legacy single filter; `any` and `all` hold lists of filters. The kinds a rule
/// matches are the union over all of them.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct MatchResources {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<ResourceFilter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<ResourceFilter>,

    #[serde(default)]
    pub resources: ResourceDescription,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ResourceFilter {
    #[serde(default)]
    pub resources: ResourceDescription,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ResourceDescription {
    /// Kinds, optionally qualified as `version/Kind` or `group/version/Kind`. `*` matches all kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVerification {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_references: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_digest: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

// === impl Spec ===

impl Spec {
    /// True when the policy enforces validation failures in at least one namespace.
    pub fn is_enforce_capable(&self) -> bool {
        self.validation_failure_action == FailureAction::Enforce
            || self
                .validation_failure_action_overrides
                .iter()
                .any(|o| o.action == FailureAction::Enforce)
    }

    /// Resolves the failure action that applies to resources in `namespace`.
    ///
    /// Overrides never apply to cluster-scoped resources (an empty namespace). Otherwise, the first
    /// override that covers the namespace replaces the default.
    pub fn effective_action(&self, namespace: &str) -> FailureAction {
        if namespace.is_empty() {
            return self.validation_failure_action;
        }

        self.validation_failure_action_overrides
            .iter()
            .find(|o| o.matches(namespace))
            .map(|o| o.action)
            .unwrap_or(self.validation_failure_action)
    }
}

// === impl FailureActionOverride ===

impl FailureActionOverride {
    pub fn matches(&self, namespace: &str) -> bool {
        self.namespaces
            .iter()
            .any(|pattern| wildcard::matches(pattern, namespace))
    }
}

// === impl Rule ===

impl Rule {
    /// Iterates over every kind named by the rule's match block. May yield duplicates.
    pub fn kinds(&self) -> impl Iterator<Item = &str> + '_ {
        let m = &self.match_resources;
        m.resources
            .kinds
            .iter()
            .chain(m.any.iter().flat_map(|f| f.resources.kinds.iter()))
            .chain(m.all.iter().flat_map(|f| f.resources.kinds.iter()))
            .map(String::as_str)
    }

    #[inline]
    pub fn has_mutate(&self) -> bool {
        is_set(&self.mutate)
    }

    #[inline]
    pub fn has_validate(&self) -> bool {
        is_set(&self.validate)
    }

    #[inline]
    pub fn has_generate(&self) -> bool {
        is_set(&self.generate)
    }

    #[inline]
    pub fn has_verify_images(&self) -> bool {
        !self.verify_images.is_empty()
    }

    /// True when an image verification entry must also run as a validation (digest or signature
    /// checks). Both checks are on unless disabled.
    pub fn has_verify_image_checks(&self) -> bool {
        self.verify_images
            .iter()
            .any(|iv| iv.verify_digest.unwrap_or(true) || iv.required.unwrap_or(true))
    }
}

fn is_set(v: &Option<Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClusterPolicy;
    use serde_json::json;

    fn ovr(action: FailureAction, namespaces: &[&str]) -> FailureActionOverride {
        FailureActionOverride {
            action,
            namespaces: namespaces.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn deserializes_cluster_policy() {
        let policy: ClusterPolicy = serde_json::from_value(json!({
            "apiVersion": "kyverno.io/v1",
            "kind": "ClusterPolicy",
            "metadata": { "name": "require-labels" },
            "spec": {
                "validationFailureAction": "enforce",
                "validationFailureActionOverrides": [
                    { "action": "audit", "namespaces": ["team-a", "dev-*"] }
                ],
                "rules": [{
                    "name": "check-for-labels",
                    "match": {
                        "any": [{ "resources": { "kinds": ["Pod", "apps/v1/Deployment"] } }]
                    },
                    "validate": {
                        "message": "label 'app.kubernetes.io/name' is required",
                        "pattern": { "metadata": { "labels": { "app.kubernetes.io/name": "?*" } } }
                    }
                }]
            }
        }))
        .expect("policy must deserialize");

        assert_eq!(policy.spec.validation_failure_action, FailureAction::Enforce);
        assert_eq!(
            policy.spec.validation_failure_action_overrides,
            vec![ovr(FailureAction::Audit, &["team-a", "dev-*"])]
        );
        let rule = &policy.spec.rules[0];
        assert_eq!(rule.kinds().collect::<Vec<_>>(), vec!["Pod", "apps/v1/Deployment"]);
        assert!(rule.has_validate());
        assert!(!rule.has_mutate());
        assert!(!rule.has_generate());
    }

    #[test]
    fn failure_action_defaults_to_audit() {
        let spec: Spec = serde_json::from_value(json!({ "rules": [] })).unwrap();
        assert_eq!(spec.validation_failure_action, FailureAction::Audit);
        assert!(!spec.is_enforce_capable());
    }

    #[test]
    fn effective_action() {
        let spec = Spec {
            validation_failure_action: FailureAction::Enforce,
            validation_failure_action_overrides: vec![
                ovr(FailureAction::Audit, &["team-a", "dev-*"]),
                ovr(FailureAction::Enforce, &["prod"]),
            ],
            ..Spec::default()
        };
        assert_eq!(spec.effective_action(""), FailureAction::Enforce);
        assert_eq!(spec.effective_action("team-a"), FailureAction::Audit);
        assert_eq!(spec.effective_action("dev-1"), FailureAction::Audit);
        assert_eq!(spec.effective_action("team-b"), FailureAction::Enforce);
        assert_eq!(spec.effective_action("prod"), FailureAction::Enforce);
    }

    #[test]
    fn enforce_capable_through_override() {
        let spec = Spec {
            validation_failure_action: FailureAction::Audit,
            validation_failure_action_overrides: vec![ovr(FailureAction::Enforce, &["prod"])],
            ..Spec::default()
        };
        assert!(spec.is_enforce_capable());
        assert_eq!(spec.effective_action("prod"), FailureAction::Enforce);
        assert_eq!(spec.effective_action("dev"), FailureAction::Audit);
    }

    #[test]
    fn image_verification_checks() {
        let mut rule = Rule {
            verify_images: vec![ImageVerification::default()],
            ..Rule::default()
        };
        assert!(rule.has_verify_images());
        assert!(rule.has_verify_image_checks());

        rule.verify_images[0].verify_digest = Some(false);
        rule.verify_images[0].required = Some(false);
        assert!(rule.has_verify_images());
        assert!(!rule.has_verify_image_checks());
    }

    #[test]
    fn empty_rule_bodies_are_unset() {
        let rule = Rule {
            mutate: Some(json!({})),
            validate: Some(Value::Null),
            generate: Some(json!({ "kind": "ConfigMap" })),
            ..Rule::default()
        };
        assert!(!rule.has_mutate());
        assert!(!rule.has_validate());
        assert!(rule.has_generate());
    }
}
