//! Process-wide metric registry rendered in the Prometheus text format.
//!
//! Histograms keep a rolling window so quantiles describe recent cycles
//! rather than the whole session.

use crate::guard::{sanitize_labels, LabelMap};
use crate::policy::current_policy;
use hdrhistogram::Histogram;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::{Duration, Instant};
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(10);
const QUANTILES: [f64; 3] = [0.5, 0.9, 0.95];

#[derive(Hash, Eq, PartialEq, Clone, PartialOrd, Ord)]
struct MetricKey {
    name: &'static str,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: &'static str, labels: LabelMap) -> Self {
        // BTreeMap iteration is already key-ordered
        Self {
            name,
            labels: sanitize_labels(labels).into_iter().collect(),
        }
    }

    fn fmt_labels(&self, extra: Option<(&str, String)>) -> String {
        let mut parts: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect();
        if let Some((k, v)) = extra {
            parts.push(format!("{k}=\"{v}\""));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", parts.join(","))
        }
    }
}

struct HistEntry {
    histogram: Histogram<u64>,
    sum: u128,
    window_start: Instant,
}

impl HistEntry {
    fn new() -> Option<Self> {
        Some(Self {
            histogram: Histogram::<u64>::new(3).ok()?,
            sum: 0,
            window_start: Instant::now(),
        })
    }
}

type Registry<V> = Mutex<HashMap<MetricKey, V>>;

static COUNTERS: OnceCell<Registry<u64>> = OnceCell::new();
static GAUGES: OnceCell<Registry<f64>> = OnceCell::new();
static HISTOGRAMS: OnceCell<Registry<HistEntry>> = OnceCell::new();

fn counters() -> &'static Registry<u64> {
    COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn gauges() -> &'static Registry<f64> {
    GAUGES.get_or_init(|| Mutex::new(HashMap::new()))
}

fn histograms() -> &'static Registry<HistEntry> {
    HISTOGRAMS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn ensure_metrics() {
    let _ = counters();
    let _ = gauges();
    let _ = histograms();
}

/// New series for `name` are refused once the policy's series limit is hit.
fn admit<V>(map: &HashMap<MetricKey, V>, key: &MetricKey) -> bool {
    if map.contains_key(key) {
        return true;
    }
    let limit = current_policy().series_limit;
    let existing = map.keys().filter(|k| k.name == key.name).count();
    if existing >= limit {
        debug!(metric = key.name, limit, "series limit reached; dropping sample");
        return false;
    }
    true
}

pub fn inc(name: &'static str, labels: LabelMap) {
    inc_by(name, 1, labels);
}

pub fn inc_by(name: &'static str, delta: u64, labels: LabelMap) {
    if !current_policy().enable_metrics {
        return;
    }
    let key = MetricKey::new(name, labels);
    let mut map = counters().lock();
    if admit(&map, &key) {
        *map.entry(key).or_insert(0) += delta;
    }
}

pub fn set(name: &'static str, value: f64, labels: LabelMap) {
    if !current_policy().enable_metrics {
        return;
    }
    let key = MetricKey::new(name, labels);
    let mut map = gauges().lock();
    if admit(&map, &key) {
        map.insert(key, value);
    }
}

pub fn observe(name: &'static str, value: u64, labels: LabelMap) {
    if !current_policy().enable_metrics {
        return;
    }
    let key = MetricKey::new(name, labels);
    let mut map = histograms().lock();
    if !admit(&map, &key) {
        return;
    }
    if !map.contains_key(&key) {
        let Some(entry) = HistEntry::new() else {
            return;
        };
        map.insert(key.clone(), entry);
    }
    if let Some(entry) = map.get_mut(&key) {
        if entry.window_start.elapsed() >= WINDOW {
            entry.histogram.reset();
            entry.sum = 0;
            entry.window_start = Instant::now();
        }
        let _ = entry.histogram.record(value);
        entry.sum += value as u128;
    }
}

pub fn counter_value(name: &str, labels: &LabelMap) -> Option<u64> {
    let wanted: Vec<(String, String)> = sanitize_labels(labels.clone()).into_iter().collect();
    counters()
        .lock()
        .iter()
        .find(|(k, _)| k.name == name && k.labels == wanted)
        .map(|(_, v)| *v)
}

pub fn render_prometheus() -> String {
    let mut output = String::new();

    let mut counter_rows: Vec<(MetricKey, u64)> = counters()
        .lock()
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    counter_rows.sort_by(|a, b| a.0.cmp(&b.0));
    let mut last = "";
    for (key, value) in &counter_rows {
        if key.name != last {
            let _ = writeln!(output, "# TYPE {} counter", key.name);
            last = key.name;
        }
        let _ = writeln!(output, "{}{} {}", key.name, key.fmt_labels(None), value);
    }

    let mut gauge_rows: Vec<(MetricKey, f64)> = gauges()
        .lock()
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    gauge_rows.sort_by(|a, b| a.0.cmp(&b.0));
    let mut last = "";
    for (key, value) in &gauge_rows {
        if key.name != last {
            let _ = writeln!(output, "# TYPE {} gauge", key.name);
            last = key.name;
        }
        let _ = writeln!(output, "{}{} {:.6}", key.name, key.fmt_labels(None), value);
    }

    let hist = histograms().lock();
    let mut hist_keys: Vec<&MetricKey> = hist.keys().collect();
    hist_keys.sort();
    let mut last = "";
    for key in hist_keys {
        let Some(entry) = hist.get(key) else {
            continue;
        };
        if entry.histogram.len() == 0 {
            continue;
        }
        if key.name != last {
            let _ = writeln!(output, "# TYPE {} summary", key.name);
            last = key.name;
        }
        for q in QUANTILES {
            let _ = writeln!(
                output,
                "{}{} {}",
                key.name,
                key.fmt_labels(Some(("quantile", format!("{q:.2}")))),
                entry.histogram.value_at_quantile(q)
            );
        }
        let _ = writeln!(
            output,
            "{}_count{} {}",
            key.name,
            key.fmt_labels(None),
            entry.histogram.len()
        );
        let _ = writeln!(
            output,
            "{}_sum{} {}",
            key.name,
            key.fmt_labels(None),
            entry.sum
        );
    }

    output
}
