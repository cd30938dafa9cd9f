use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounter, IntGauge, Registry};
use tracing::error;

lazy_static! {
    static ref PENDING_TIMERS: IntGauge = IntGauge::new(
        "tabguard_pending_timers",
        "Tabs with an open debounce window"
    )
    .unwrap();
    static ref TIMERS_ARMED: IntCounter =
        IntCounter::new("tabguard_timers_armed_total", "Debounce windows opened").unwrap();
    static ref TIMERS_CANCELLED: IntCounter = IntCounter::new(
        "tabguard_timers_cancelled_total",
        "Debounce windows cancelled before firing"
    )
    .unwrap();
    static ref TIMERS_FIRED: IntCounter =
        IntCounter::new("tabguard_timers_fired_total", "Debounce windows that settled").unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register scheduler metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, PENDING_TIMERS.clone());
    register(registry, TIMERS_ARMED.clone());
    register(registry, TIMERS_CANCELLED.clone());
    register(registry, TIMERS_FIRED.clone());
}

pub(crate) fn set_pending(count: usize) {
    PENDING_TIMERS.set(count as i64);
}

pub(crate) fn record_armed() {
    TIMERS_ARMED.inc();
}

pub(crate) fn record_cancelled() {
    TIMERS_CANCELLED.inc();
}

pub(crate) fn record_fired() {
    TIMERS_FIRED.inc();
}
