use lazy_static::lazy_static;
use prometheus::{core::Collector, opts, IntCounterVec, Registry};
use tracing::error;

lazy_static! {
    static ref ORACLE_CALLS: IntCounterVec = IntCounterVec::new(
        opts!(
            "tabguard_oracle_calls_total",
            "Oracle calls grouped by outcome"
        ),
        &["outcome"]
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register oracle metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, ORACLE_CALLS.clone());
}

pub(crate) fn record_call(outcome: &str) {
    ORACLE_CALLS.with_label_values(&[outcome]).inc();
}
