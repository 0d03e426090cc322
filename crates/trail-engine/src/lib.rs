//! Live crawl trail: aggregates fetch START/END notifications from a queue
//! into a bounded, time-ordered window and hands it to a renderer.

pub mod adapters;
pub mod api;
pub mod decode;
pub mod drain;
pub mod errors;
pub mod fixtures;
pub mod model;
pub mod policy;
pub mod ports;
pub mod render;
pub mod state;
pub mod window;

pub use api::TrailMonitorBuilder;
pub use decode::{decode, decode_str};
pub use drain::DrainLoop;
pub use errors::{TrailError, TrailResult};
pub use model::{
    ApplyOutcome, ClosedEntry, CompletionMarker, CycleReport, DrainState, EventKind,
    LifecycleEvent, OpenEntry, Pulled, RawMessage, Segment, Selection, SessionReport, StopReason,
    TimeBounds, WindowSnapshot,
};
pub use policy::{current_policy, set_policy, TrailPolicyHandle, TrailPolicyView};
pub use ports::{
    Clock, EventsPort, FixedClock, MetricLabels, MetricsPort, ProgressGate, RendererPort,
    SystemClock, TransportPort,
};
pub use state::TrailState;
pub use window::{select, SnapshotDiff};
