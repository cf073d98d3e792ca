use kyverno_policy_controller_core::{ConfigError, NamespacedResourceResolver, ResolveError};
use std::sync::Arc;

/// Tries each resolver in order and returns the first object found.
///
/// When every resolver fails, the last resolver's error is returned. Earlier errors, including
/// transport errors, only cause a fall through to the next resolver.
pub struct ResolverChain<T> {
    head: Vec<Arc<dyn NamespacedResourceResolver<T>>>,
    last: Arc<dyn NamespacedResourceResolver<T>>,
}

// === impl ResolverChain ===

impl<T> ResolverChain<T> {
    pub fn new(
        resolvers: impl IntoIterator<Item = Arc<dyn NamespacedResourceResolver<T>>>,
    ) -> Result<Self, ConfigError> {
        let mut head = resolvers.into_iter().collect::<Vec<_>>();
        let last = head.pop().ok_or(ConfigError::NoResolvers)?;
        Ok(Self { head, last })
    }

    pub fn len(&self) -> usize {
        self.head.len() + 1
    }
}

impl<T> Clone for ResolverChain<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            last: self.last.clone(),
        }
    }
}

#[async_trait::async_trait]
impl<T: Send + 'static> NamespacedResourceResolver<T> for ResolverChain<T> {
    async fn get(&self, namespace: &str, name: &str) -> Result<T, ResolveError> {
        for (i, resolver) in self.head.iter().enumerate() {
            match resolver.get(namespace, name).await {
                Ok(obj) => return Ok(obj),
                Err(error) => {
                    tracing::trace!(%namespace, %name, resolver = i, %error, "Falling through")
                }
            }
        }
        self.last.get(namespace, name).await
    }
}
