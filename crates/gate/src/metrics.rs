use lazy_static::lazy_static;
use prometheus::{core::Collector, opts, IntCounter, IntCounterVec, Registry};
use tracing::error;

lazy_static! {
    static ref SETTLE_OUTCOMES: IntCounterVec = IntCounterVec::new(
        opts!(
            "tabguard_settle_outcomes_total",
            "Settled navigations grouped by outcome"
        ),
        &["outcome"]
    )
    .unwrap();
    static ref REDIRECTS: IntCounter =
        IntCounter::new("tabguard_redirects_total", "Tabs redirected to the blocked page").unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register gate metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, SETTLE_OUTCOMES.clone());
    register(registry, REDIRECTS.clone());
}

pub(crate) fn record_outcome(outcome: &str) {
    SETTLE_OUTCOMES.with_label_values(&[outcome]).inc();
}

pub(crate) fn record_redirect() {
    REDIRECTS.inc();
}
