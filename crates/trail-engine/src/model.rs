use chrono::{DateTime, Utc};
use crawltrail_core_types::{SessionId, UrlKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    End,
}

/// One decoded "fetch started" / "fetch ended" notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub url: String,
    pub key: UrlKey,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub status: Option<String>,
}

/// Undecoded payload as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub body: Vec<u8>,
}

impl RawMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }
}

/// Result of one transport pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pulled {
    Message(RawMessage),
    /// Nothing arrived within the pull timeout. Not an error.
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenEntry {
    pub key: UrlKey,
    pub start: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClosedEntry {
    pub key: UrlKey,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// What applying a single event did to the trail state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Opened,
    /// Start for a key that was already open; start time overwritten.
    Restarted,
    /// Start for a key that had completed; the closed entry is replaced.
    Reopened,
    Closed,
    /// End without a matching open entry; dropped.
    OrphanEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub key: UrlKey,
    pub start: DateTime<Utc>,
    /// Completion time for closed entries, the snapshot's `now` otherwise.
    pub end: DateTime<Utc>,
    pub closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionMarker {
    pub key: UrlKey,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeBounds {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
}

/// Bounded, time-ordered view handed to the renderer. Recomputed from
/// scratch every cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub generated_at: DateTime<Utc>,
    pub segments: Vec<Segment>,
    pub markers: Vec<CompletionMarker>,
    pub bounds: TimeBounds,
    pub open_total: usize,
    pub closed_total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Nothing tracked yet; callers should skip drawing.
    NoData,
    Window(WindowSnapshot),
}

impl Selection {
    pub fn snapshot(&self) -> Option<&WindowSnapshot> {
        match self {
            Selection::NoData => None,
            Selection::Window(snapshot) => Some(snapshot),
        }
    }

    pub fn into_snapshot(self) -> Option<WindowSnapshot> {
        match self {
            Selection::NoData => None,
            Selection::Window(snapshot) => Some(snapshot),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Selection::NoData)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrainState {
    Idle,
    Polling,
    Draining,
    Rendering,
    Stopped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The progress gate reported the crawl job inactive.
    JobFinished,
    /// The cancellation token fired.
    Cancelled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleReport {
    pub pulled: usize,
    pub applied: usize,
    pub rejected: usize,
    pub orphaned: usize,
    pub evicted: usize,
    pub rendered: bool,
    /// The transport went quiet before the batch ceiling was reached.
    pub drained_early: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionReport {
    pub session: SessionId,
    pub cycles: u64,
    pub messages: u64,
    pub rejected: u64,
    pub orphaned: u64,
    pub stop: StopReason,
}
