use kube::{
    runtime::reflector::{ObjectRef, Store},
    Resource,
};
use kyverno_policy_controller_core::{ConfigError, NamespacedResourceResolver, ResolveError};
use std::sync::Arc;

/// Resolves objects from a local store populated by a watch.
///
/// Reads never block on the network and may be stale. A miss does not distinguish between an object
/// that does not exist, one that is not eligible for caching, and one the watch has not yet seen.
pub struct CacheResolver<K>
where
    K: Resource<DynamicType = ()> + 'static,
{
    store: Store<K>,
}

// === impl CacheResolver ===

impl<K> CacheResolver<K>
where
    K: Resource<DynamicType = ()> + 'static,
{
    pub fn new(store: Option<Store<K>>) -> Result<Self, ConfigError> {
        let store = store.ok_or(ConfigError::MissingHandle("watch-cache store"))?;
        Ok(Self { store })
    }
}

#[async_trait::async_trait]
impl<K> NamespacedResourceResolver<Arc<K>> for CacheResolver<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Arc<K>, ResolveError> {
        let key = ObjectRef::new(name).within(namespace);
        self.store
            .get(&key)
            .ok_or_else(|| ResolveError::not_found(K::kind(&()), namespace, name))
    }
}
