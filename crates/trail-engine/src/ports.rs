use crate::errors::{TrailError, TrailResult};
use crate::model::{CycleReport, Pulled, SessionReport, WindowSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// Queue the crawler publishes lifecycle events to. Delivery is
/// at-least-once and may be duplicated or reordered.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Waits up to `timeout` for the next message. An idle queue yields
    /// [`Pulled::Empty`]; an unreachable one yields [`TrailError::Transport`].
    async fn pull(&self, timeout: Duration) -> TrailResult<Pulled>;

    /// Releases the underlying connection. Called once when the session ends.
    async fn close(&self);
}

/// Reports whether the crawl job driving the session is still running.
#[async_trait]
pub trait ProgressGate: Send + Sync {
    async fn progress(&self) -> bool;
}

/// Draws windowed snapshots. Owns whatever incremental drawing state it needs.
#[async_trait]
pub trait RendererPort: Send + Sync {
    async fn render(&self, snapshot: &WindowSnapshot) -> TrailResult<()>;
}

pub trait EventsPort: Send + Sync {
    fn cycle_completed(&self, cycle: u64, report: &CycleReport);
    fn message_rejected(&self, err: &TrailError);
    fn orphan_end(&self, key: &str);
    fn session_stopped(&self, report: &SessionReport);
}

pub type MetricLabels = BTreeMap<String, String>;

pub trait MetricsPort: Send + Sync {
    fn inc(&self, name: &'static str, labels: MetricLabels);
    fn gauge(&self, name: &'static str, value: f64);
    fn observe_ms(&self, name: &'static str, ms: u64);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant; replays and tests use it for stable output.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
