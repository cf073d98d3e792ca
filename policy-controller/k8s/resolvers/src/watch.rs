use futures::prelude::*;
use kube::{
    runtime::{
        reflector::{self, Store},
        watcher,
    },
    Resource,
};

/// Mirrors a stream of watch events into a [`Store`].
///
/// Returns the store's read handle and the task that populates it. The store is empty until the
/// task is polled, and the task completes when the event stream ends.
pub fn reflect<K, S>(events: S) -> (Store<K>, impl Future<Output = ()> + Send + 'static)
where
    K: Resource<DynamicType = ()> + Clone + std::fmt::Debug + Send + Sync + 'static,
    S: Stream<Item = watcher::Event<K>> + Send + 'static,
{
    let (store, writer) = reflector::store();
    let task = reflector::reflector(writer, events.map(Ok::<_, watcher::Error>))
        .for_each(|_| future::ready(()));
    (store, task)
}
