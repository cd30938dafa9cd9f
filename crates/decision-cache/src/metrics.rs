use lazy_static::lazy_static;
use prometheus::{core::Collector, opts, IntCounter, IntCounterVec, IntGauge, Registry};
use tracing::error;

lazy_static! {
    static ref CACHE_LOOKUPS: IntCounterVec = IntCounterVec::new(
        opts!(
            "tabguard_cache_lookups_total",
            "Decision cache lookups grouped by result"
        ),
        &["result"]
    )
    .unwrap();
    static ref CACHE_ENTRIES: IntGauge = IntGauge::new(
        "tabguard_cache_entries",
        "Entries held by the decision cache, fresh or stale"
    )
    .unwrap();
    static ref CACHE_EVICTIONS: IntCounter = IntCounter::new(
        "tabguard_cache_evictions_total",
        "Entries evicted because the cache reached its capacity"
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register decision cache metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, CACHE_LOOKUPS.clone());
    register(registry, CACHE_ENTRIES.clone());
    register(registry, CACHE_EVICTIONS.clone());
}

pub(crate) fn record_lookup(result: &str) {
    CACHE_LOOKUPS.with_label_values(&[result]).inc();
}

pub(crate) fn set_entries(count: usize) {
    CACHE_ENTRIES.set(count as i64);
}

pub(crate) fn record_eviction() {
    CACHE_EVICTIONS.inc();
}
