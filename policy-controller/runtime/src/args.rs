use crate::{
    index::{metrics::IndexMetrics, Cache, PolicyIndex},
    k8s::{ClusterPolicy, ConfigMap, Policy},
    resolvers::{self, ResolverMetrics, LABEL_CACHE_KEY},
    Context,
};
use anyhow::{bail, Result};
use clap::Parser;
use futures::prelude::*;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::{sync::Arc, time::Duration};
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "kyverno-policy-controller",
    about = "Indexes policies and resolves the ConfigMaps their rules reference"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "kyverno=info,warn",
        env = "KYVERNO_POLICY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Disables the ConfigMap watch-cache so that every lookup goes to the API server.
    #[clap(long)]
    configmap_cache_disabled: bool,

    /// Only ConfigMaps carrying this label are mirrored by the watch-cache.
    #[clap(long, default_value = LABEL_CACHE_KEY)]
    configmap_cache_label: String,

    /// Bounds each API server lookup. Zero disables the timeout.
    #[clap(long, default_value = "5000")]
    configmap_lookup_timeout_ms: u64,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    #[inline]
    pub async fn run(self) -> Result<()> {
        self.run_with(|_| future::ready(())).await
    }

    /// Runs the controller, spawning `consumer` with the shared [`Context`] once the watches have
    /// been started.
    pub async fn run_with<F, Fut>(self, consumer: F) -> Result<()>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            configmap_cache_disabled,
            configmap_cache_label,
            configmap_lookup_timeout_ms,
        } = self;

        // Validate the label before anything is started.
        let selector = if configmap_cache_disabled {
            None
        } else {
            Some(resolvers::selector_for(&configmap_cache_label)?)
        };
        let lookup_timeout = lookup_timeout(configmap_lookup_timeout_ms);

        let cache = Cache::shared();
        let policy_index = PolicyIndex::shared(cache.clone());

        let mut prom = <Registry>::default();
        let index =
            IndexMetrics::register(policy_index, prom.sub_registry_with_prefix("policy")).shared();
        let resolver_metrics =
            ResolverMetrics::register(prom.sub_registry_with_prefix("configmap_resolver"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        // Spawn resource watches.

        let cluster_policies = runtime.watch_all::<ClusterPolicy>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(index.clone(), cluster_policies)
                .instrument(info_span!("clusterpolicies")),
        );

        let policies = runtime.watch_all::<Policy>(watcher::Config::default());
        tokio::spawn(kubert::index::namespaced(index, policies).instrument(info_span!("policies")));

        let store = match selector {
            Some(selector) => {
                let labels = selector.to_string();
                info!(%labels, "Caching labeled ConfigMaps");
                let configmaps =
                    runtime.watch_all::<ConfigMap>(watcher::Config::default().labels(&labels));
                let (store, task) = resolvers::reflect(configmaps);
                tokio::spawn(task.instrument(info_span!("configmaps")));
                Some(store)
            }
            None => {
                info!("ConfigMap watch-cache disabled");
                None
            }
        };

        let configmaps = resolvers::resolver_chain(
            Some(runtime.client()),
            store,
            lookup_timeout,
            &resolver_metrics,
        )?;
        tokio::spawn(consumer(Context::new(cache, Arc::new(configmaps))));

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

fn lookup_timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["kyverno-policy-controller"]).expect("defaults must parse");
        assert!(!args.configmap_cache_disabled);
        assert_eq!(args.configmap_cache_label, LABEL_CACHE_KEY);
        assert_eq!(args.configmap_lookup_timeout_ms, 5000);
    }

    #[test]
    fn configmap_flags() {
        let args = Args::try_parse_from([
            "kyverno-policy-controller",
            "--configmap-cache-disabled",
            "--configmap-cache-label=example.com/cached",
            "--configmap-lookup-timeout-ms=0",
        ])
        .expect("flags must parse");
        assert!(args.configmap_cache_disabled);
        assert_eq!(args.configmap_cache_label, "example.com/cached");
        assert_eq!(lookup_timeout(args.configmap_lookup_timeout_ms), None);
    }

    #[cfg(feature = "openssl-tls")]
    #[tokio::test]
    async fn builds_tls_clients() {
        let config = kube::Config::new("https://127.0.0.1:6443".parse().expect("valid URL"));
        kube::Client::try_from(config).expect("TLS client must build");
    }

    #[test]
    fn lookup_timeouts() {
        assert_eq!(lookup_timeout(0), None);
        assert_eq!(lookup_timeout(250), Some(Duration::from_millis(250)));
    }
}
