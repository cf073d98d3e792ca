use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use kyverno_policy_controller_core::{ConfigError, NamespacedResourceResolver, ResolveError};
use serde::de::DeserializeOwned;
use std::{fmt, marker::PhantomData, sync::Arc, time::Duration};

/// Resolves objects with a `GET` against the API server.
///
/// Each lookup makes exactly one request. When a timeout is configured, a request that does not
/// complete in time fails with [`ResolveError::Timeout`].
pub struct ClientResolver<K> {
    client: Client,
    timeout: Option<Duration>,
    _marker: PhantomData<fn() -> K>,
}

// === impl ClientResolver ===

impl<K> ClientResolver<K> {
    pub fn new(client: Option<Client>) -> Result<Self, ConfigError> {
        let client = client.ok_or(ConfigError::MissingHandle("API client"))?;
        Ok(Self {
            client,
            timeout: None,
            _marker: PhantomData,
        })
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }
}

#[async_trait::async_trait]
impl<K> NamespacedResourceResolver<Arc<K>> for ClientResolver<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    K: Clone + DeserializeOwned + fmt::Debug + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Arc<K>, ResolveError> {
        let api = Api::<K>::namespaced(self.client.clone(), namespace);
        let res = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, api.get(name))
                .await
                .map_err(|_| ResolveError::Timeout(timeout))?,
            None => api.get(name).await,
        };

        match res {
            Ok(obj) => Ok(Arc::new(obj)),
            Err(error) if is_not_found(&error) => Err(ResolveError::not_found_from(
                K::kind(&()),
                namespace,
                name,
                error,
            )),
            Err(error) => Err(ResolveError::api(error)),
        }
    }
}

fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(status) if status.code == 404)
}
