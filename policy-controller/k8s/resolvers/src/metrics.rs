use kyverno_policy_controller_core::{NamespacedResourceResolver, ResolveError};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

/// Counts resolver lookups by strategy and outcome.
///
/// The default value is not registered with any registry; it is useful when metrics are not
/// exported.
#[derive(Clone, Debug, Default)]
pub struct ResolverMetrics {
    lookups: Family<LookupLabels, Counter>,
}

/// Wraps a resolver to record the outcome of each lookup.
pub struct Instrumented<R> {
    inner: R,
    strategy: &'static str,
    metrics: ResolverMetrics,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct LookupLabels {
    strategy: String,
    result: String,
}

// === impl ResolverMetrics ===

impl ResolverMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let lookups = Family::default();
        prom.register(
            "lookups",
            "Count of lookups by resolver strategy and result",
            lookups.clone(),
        );
        Self { lookups }
    }

    pub fn instrument<R>(&self, strategy: &'static str, inner: R) -> Instrumented<R> {
        Instrumented {
            inner,
            strategy,
            metrics: self.clone(),
        }
    }

    fn record(&self, strategy: &'static str, result: &'static str) {
        self.lookups
            .get_or_create(&LookupLabels {
                strategy: strategy.to_string(),
                result: result.to_string(),
            })
            .inc();
    }
}

// === impl Instrumented ===

#[async_trait::async_trait]
impl<T, R> NamespacedResourceResolver<T> for Instrumented<R>
where
    R: NamespacedResourceResolver<T>,
    T: Send + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<T, ResolveError> {
        let res = self.inner.get(namespace, name).await;
        let result = match &res {
            Ok(_) => "hit",
            Err(error) if error.is_not_found() => "not_found",
            Err(_) => "error",
        };
        self.metrics.record(self.strategy, result);
        res
    }
}
