//! Resolves `ConfigMap`s referenced by policy rules.
//!
//! Lookups go first to a local watch-cache and, on a miss, to the API server. The watch-cache only
//! mirrors objects that carry the [`LABEL_CACHE_KEY`] label, so its size is bounded by what users
//! opt in rather than by the number of `ConfigMap`s in the cluster. Objects without the label are
//! still resolvable; they simply cost a round trip.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod cache;
mod chain;
mod client;
pub mod metrics;
mod selector;
mod watch;


pub use self::{
    cache::CacheResolver,
    chain::ResolverChain,
    client::ClientResolver,
    metrics::ResolverMetrics,
    selector::{cache_selector, selector_for, LABEL_CACHE_KEY},
    watch::reflect,
};
pub use kyverno_policy_controller_core::{ConfigError, NamespacedResourceResolver, ResolveError};

use kube::{runtime::reflector::Store, Client};
use kyverno_policy_controller_k8s_api::ConfigMap;
use std::{sync::Arc, time::Duration};

pub type ConfigMapResolver = dyn NamespacedResourceResolver<Arc<ConfigMap>>;

/// Builds the conventional `ConfigMap` resolver: the watch-cache (when a store is provided)
/// followed by the API server (when a client is provided).
///
/// Fails when neither handle is provided.
pub fn resolver_chain(
    client: Option<Client>,
    store: Option<Store<ConfigMap>>,
    timeout: Option<Duration>,
    metrics: &ResolverMetrics,
) -> Result<ResolverChain<Arc<ConfigMap>>, ConfigError> {
    let mut resolvers: Vec<Arc<ConfigMapResolver>> = Vec::with_capacity(2);

    if let Some(store) = store {
        let cache = CacheResolver::new(Some(store))?;
        resolvers.push(Arc::new(metrics.instrument("cache", cache)));
    }

    if let Some(client) = client {
        let mut live = ClientResolver::<ConfigMap>::new(Some(client))?;
        if let Some(timeout) = timeout {
            live = live.with_timeout(timeout);
        }
        resolvers.push(Arc::new(metrics.instrument("client", live)));
    }

    tracing::info!(resolvers = resolvers.len(), "Configured ConfigMap resolvers");
    ResolverChain::new(resolvers)
}
