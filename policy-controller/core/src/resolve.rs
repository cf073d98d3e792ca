//! Point lookups of namespaced reference data.
//!
//! Rules may reference objects that live outside of the admitted resource (e.g. a `ConfigMap`
//! holding an allow-list). A [`NamespacedResourceResolver`] fetches such an object by namespace and
//! name. Implementations range from a local watch-cache read to a request against the API server,
//! and a chain of resolvers is itself a resolver.

use std::{error::Error as StdError, time::Duration};

/// Resolves a single namespaced object by name.
///
/// Implementations must not retry: each call makes at most one attempt and surfaces its error
/// directly. Dropping the returned future cancels the lookup.
#[async_trait::async_trait]
pub trait NamespacedResourceResolver<T>: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<T, ResolveError>;
}

/// Errors returned by a single lookup.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The object is not present in the consulted source.
    ///
    /// When the source is the API server, the `Status` it returned is kept as the error's source.
    #[error("{kind} {name:?} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    },

    /// The lookup did not complete within its configured timeout.
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    /// The API server (or the transport to it) reported an error.
    #[error(transparent)]
    Api(Box<dyn StdError + Send + Sync + 'static>),
}

/// Errors detected while assembling resolvers.
///
/// These describe a misconfigured process and are reported once, at startup.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be provided")]
    MissingHandle(&'static str),

    #[error("at least one resolver must be configured")]
    NoResolvers,

    #[error("invalid label key {key:?}: {reason}")]
    InvalidLabelKey { key: String, reason: String },
}

// === impl NamespacedResourceResolver ===

#[async_trait::async_trait]
impl<T, R> NamespacedResourceResolver<T> for std::sync::Arc<R>
where
    R: NamespacedResourceResolver<T> + ?Sized,
    T: Send + 'static,
{
    #[inline]
    async fn get(&self, namespace: &str, name: &str) -> Result<T, ResolveError> {
        (**self).get(namespace, name).await
    }
}

// === impl ResolveError ===

impl ResolveError {
    pub fn not_found(
        kind: impl AsRef<str>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.as_ref().to_ascii_lowercase(),
            namespace: namespace.into(),
            name: name.into(),
            source: None,
        }
    }

    /// Like [`ResolveError::not_found`], retaining the error reported by the source.
    pub fn not_found_from(
        kind: impl AsRef<str>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        error: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::NotFound {
            kind: kind.as_ref().to_ascii_lowercase(),
            namespace: namespace.into(),
            name: name.into(),
            source: Some(Box::new(error)),
        }
    }

    pub fn api(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Api(Box::new(error))
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Fixed(&'static str);

    #[async_trait::async_trait]
    impl NamespacedResourceResolver<String> for Fixed {
        async fn get(&self, namespace: &str, name: &str) -> Result<String, ResolveError> {
            if name == self.0 {
                Ok(format!("{namespace}/{name}"))
            } else {
                Err(ResolveError::not_found("ConfigMap", namespace, name))
            }
        }
    }

    #[test]
    fn not_found_message() {
        let error = ResolveError::not_found("ConfigMap", "default", "myconfigmap1");
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "configmap \"myconfigmap1\" not found");
    }

    #[test]
    fn not_found_keeps_source() {
        let error = ResolveError::not_found_from(
            "ConfigMap",
            "default",
            "myconfigmap1",
            std::io::Error::other("configmaps \"myconfigmap1\" not found"),
        );
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "configmap \"myconfigmap1\" not found");
        assert_eq!(
            StdError::source(&error).map(|e| e.to_string()),
            Some("configmaps \"myconfigmap1\" not found".to_string())
        );

        let bare = ResolveError::not_found("ConfigMap", "default", "myconfigmap1");
        assert!(StdError::source(&bare).is_none());
    }

    #[tokio::test]
    async fn shared_resolvers_delegate() {
        let resolver: Arc<dyn NamespacedResourceResolver<String>> = Arc::new(Fixed("cm"));
        assert_eq!(resolver.get("ns", "cm").await.unwrap(), "ns/cm");
        assert!(resolver.get("ns", "other").await.unwrap_err().is_not_found());
    }
}
