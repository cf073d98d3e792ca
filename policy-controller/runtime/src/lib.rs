#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use kyverno_policy_controller_core as core;
pub use kyverno_policy_controller_k8s_api as k8s;
pub use kyverno_policy_controller_k8s_index as index;
pub use kyverno_policy_controller_k8s_resolvers as resolvers;

mod args;

pub use self::args::Args;

use std::sync::Arc;

/// Handles shared with admission and background consumers once the controller is running.
#[derive(Clone)]
pub struct Context {
    policies: index::SharedCache,
    configmaps: Arc<resolvers::ConfigMapResolver>,
}

// === impl Context ===

impl Context {
    pub fn new(policies: index::SharedCache, configmaps: Arc<resolvers::ConfigMapResolver>) -> Self {
        Self {
            policies,
            configmaps,
        }
    }

    /// The policy selection cache, fed by `ClusterPolicy` and `Policy` watches.
    pub fn policies(&self) -> &index::SharedCache {
        &self.policies
    }

    /// Resolves `ConfigMap`s referenced by rules.
    pub fn configmaps(&self) -> &Arc<resolvers::ConfigMapResolver> {
        &self.configmaps
    }
}
