use crate::ports::{MetricLabels, MetricsPort};
use parking_lot::Mutex;

#[derive(Default)]
pub struct NoopMetrics;

impl MetricsPort for NoopMetrics {
    fn inc(&self, _name: &'static str, _labels: MetricLabels) {}

    fn gauge(&self, _name: &'static str, _value: f64) {}

    fn observe_ms(&self, _name: &'static str, _ms: u64) {}
}

/// Keeps every sample in memory. Handy for asserting on what a session
/// reported without a process-wide registry.
#[derive(Default)]
pub struct RecordingMetrics {
    counters: Mutex<Vec<(&'static str, MetricLabels)>>,
    gauges: Mutex<Vec<(&'static str, f64)>>,
    timings: Mutex<Vec<(&'static str, u64)>>,
}

impl RecordingMetrics {
    pub fn count(&self, name: &str, label: Option<(&str, &str)>) -> usize {
        self.counters
            .lock()
            .iter()
            .filter(|(n, labels)| {
                *n == name
                    && label
                        .map(|(k, v)| labels.get(k).map(String::as_str) == Some(v))
                        .unwrap_or(true)
            })
            .count()
    }

    pub fn last_gauge(&self, name: &str) -> Option<f64> {
        self.gauges
            .lock()
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn timings(&self, name: &str) -> usize {
        self.timings.lock().iter().filter(|(n, _)| *n == name).count()
    }
}

impl MetricsPort for RecordingMetrics {
    fn inc(&self, name: &'static str, labels: MetricLabels) {
        self.counters.lock().push((name, labels));
    }

    fn gauge(&self, name: &'static str, value: f64) {
        self.gauges.lock().push((name, value));
    }

    fn observe_ms(&self, name: &'static str, ms: u64) {
        self.timings.lock().push((name, ms));
    }
}
