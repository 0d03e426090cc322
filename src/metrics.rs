use trail_engine::{MetricLabels, MetricsPort};
use trail_observe::metrics;

/// Forwards drain-loop samples into the process-wide `trail-observe`
/// registry that backs `/metrics`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObserveMetrics;

impl MetricsPort for ObserveMetrics {
    fn inc(&self, name: &'static str, labels: MetricLabels) {
        metrics::inc(name, labels);
    }

    fn gauge(&self, name: &'static str, value: f64) {
        metrics::set(name, value, MetricLabels::new());
    }

    fn observe_ms(&self, name: &'static str, ms: u64) {
        metrics::observe(name, ms, MetricLabels::new());
    }
}
