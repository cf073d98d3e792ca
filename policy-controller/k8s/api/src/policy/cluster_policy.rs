use super::spec::Spec;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Declares rules that apply to matching resources across the whole cluster.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize)]
#[kube(
    group = "kyverno.io",
    version = "v1",
    kind = "ClusterPolicy",
    shortname = "cpol",
    schema = "disabled"
)]
pub struct ClusterPolicySpec {
    #[serde(flatten)]
    pub inner: Spec,
}

impl std::ops::Deref for ClusterPolicySpec {
    type Target = Spec;

    #[inline]
    fn deref(&self) -> &Spec {
        &self.inner
    }
}

impl From<Spec> for ClusterPolicySpec {
    fn from(inner: Spec) -> Self {
        Self { inner }
    }
}
