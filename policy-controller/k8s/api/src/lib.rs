#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod policy;
mod wildcard;

pub use self::policy::{ClusterPolicy, Policy, PolicyResource};
pub use k8s_openapi::api::{self, core::v1::ConfigMap};
pub use kube::{
    api::{ObjectMeta, ResourceExt},
    Client, Resource,
};
