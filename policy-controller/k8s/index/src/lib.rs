//! Kyverno Policy Index
//!
//! Every admission request must learn which policies apply to the admitted resource without
//! touching the network. This crate maintains that answer in memory:
//!
//! - The store indexes each policy under every `(policy type, kind, namespace)` triple implied by
//!   its rules and scope. `ClusterPolicy` resources are indexed with an empty namespace; `Policy`
//!   resources with their own namespace. Kind `*` matches every kind.
//! - The [`Cache`] answers [`Cache::get_policies`] by unioning the cluster-wide and namespaced
//!   buckets for the exact and wildcard kinds, then filters validation policies by the failure
//!   action that is in effect for the requested namespace.
//! - The [`PolicyIndex`] feeds the cache from `kubert` watches of `ClusterPolicy` and `Policy`
//!   resources.
//!
//! ```text
//! [ ClusterPolicy | Policy ] -> PolicyIndex -> Cache(set/unset) <- get_policies(type, kind, ns)
//! ```
//!
//! The cache owns its synchronization. Lookups take a shared lock and never observe a partially
//! applied update; updates are rare (policy create/update/delete) and serialize on an exclusive
//! lock.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod cache;
mod index;
pub mod metrics;
mod store;


pub use self::{
    cache::{Cache, SharedCache},
    index::{PolicyIndex, SharedIndex},
};
pub use kyverno_policy_controller_core::PolicyType;
