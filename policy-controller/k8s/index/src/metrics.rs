use kube::Resource;
use kubert::index::{ClusterRemoved, NamespacedRemoved};
use parking_lot::RwLock;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use std::sync::Arc;

/// Instruments an index with counts of the watch events applied to it and a gauge of its size.
pub struct IndexMetrics<T> {
    inner: T,

    index_size: Family<IndexLabels, Gauge>,
    index_applies: Family<IndexLabels, Counter>,
    index_deletes: Family<IndexLabels, Counter>,
    index_resets: Family<IndexLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct IndexLabels {
    kind: String,
}

/// Reports the number of resources of type `R` held by an index.
pub trait SizedIndex<R> {
    fn size(&self) -> usize;
}

impl<T, R> SizedIndex<R> for Arc<RwLock<T>>
where
    T: SizedIndex<R>,
{
    fn size(&self) -> usize {
        self.read().size()
    }
}

impl<T> IndexMetrics<T> {
    pub fn register(inner: T, prom: &mut Registry) -> Self {
        let index_size = Family::default();
        prom.register(
            "index_size",
            "Gauge of the number of resources in the index",
            index_size.clone(),
        );

        let index_applies = Family::default();
        prom.register(
            "index_applies",
            "Count of applies to the index",
            index_applies.clone(),
        );

        let index_deletes = Family::default();
        prom.register(
            "index_deletes",
            "Count of deletes to the index",
            index_deletes.clone(),
        );

        let index_resets = Family::default();
        prom.register(
            "index_resets",
            "Count of resets to the index",
            index_resets.clone(),
        );

        Self {
            inner,
            index_size,
            index_applies,
            index_deletes,
            index_resets,
        }
    }

    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }
}

impl<T> IndexMetrics<Arc<RwLock<T>>> {
    fn labels<R: Resource<DynamicType = ()>>() -> IndexLabels {
        IndexLabels {
            kind: R::kind(&()).to_string(),
        }
    }

    fn observe_size<R>(&self, labels: &IndexLabels)
    where
        R: Resource<DynamicType = ()>,
        T: SizedIndex<R>,
    {
        let size = SizedIndex::<R>::size(&self.inner);
        self.index_size.get_or_create(labels).set(size as i64);
    }
}

impl<R, T> kubert::index::IndexClusterResource<R> for IndexMetrics<Arc<RwLock<T>>>
where
    T: SizedIndex<R>,
    T: kubert::index::IndexClusterResource<R>,
    R: Resource<DynamicType = ()>,
{
    fn apply(&mut self, resource: R) {
        let labels = Self::labels::<R>();
        self.index_applies.get_or_create(&labels).inc();
        self.inner.write().apply(resource);
        self.observe_size::<R>(&labels);
    }

    fn delete(&mut self, name: String) {
        let labels = Self::labels::<R>();
        self.index_deletes.get_or_create(&labels).inc();
        self.inner.write().delete(name);
        self.observe_size::<R>(&labels);
    }

    fn reset(&mut self, resources: Vec<R>, removed: ClusterRemoved) {
        let labels = Self::labels::<R>();
        self.index_resets.get_or_create(&labels).inc();
        self.inner.write().reset(resources, removed);
        self.observe_size::<R>(&labels);
    }
}

impl<R, T> kubert::index::IndexNamespacedResource<R> for IndexMetrics<Arc<RwLock<T>>>
where
    T: SizedIndex<R>,
    T: kubert::index::IndexNamespacedResource<R>,
    R: Resource<DynamicType = ()>,
{
    fn apply(&mut self, resource: R) {
        let labels = Self::labels::<R>();
        self.index_applies.get_or_create(&labels).inc();
        self.inner.write().apply(resource);
        self.observe_size::<R>(&labels);
    }

    fn delete(&mut self, namespace: String, name: String) {
        let labels = Self::labels::<R>();
        self.index_deletes.get_or_create(&labels).inc();
        self.inner.write().delete(namespace, name);
        self.observe_size::<R>(&labels);
    }

    fn reset(&mut self, resources: Vec<R>, removed: NamespacedRemoved) {
        let labels = Self::labels::<R>();
        self.index_resets.get_or_create(&labels).inc();
        self.inner.write().reset(resources, removed);
        self.observe_size::<R>(&labels);
    }
}
