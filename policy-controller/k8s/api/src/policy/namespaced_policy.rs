use super::spec::Spec;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Declares rules that apply to matching resources in the policy's own namespace.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize)]
#[kube(
    group = "kyverno.io",
    version = "v1",
    kind = "Policy",
    shortname = "pol",
    namespaced,
    schema = "disabled"
)]
pub struct PolicySpec {
    #[serde(flatten)]
    pub inner: Spec,
}

impl std::ops::Deref for PolicySpec {
    type Target = Spec;

    #[inline]
    fn deref(&self) -> &Spec {
        &self.inner
    }
}

impl From<Spec> for PolicySpec {
    fn from(inner: Spec) -> Self {
        Self { inner }
    }
}
