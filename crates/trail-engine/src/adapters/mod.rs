pub mod events;
pub mod gates;
pub mod lines;
pub mod metrics;
pub mod queue;

pub use events::{BusEventsPort, NoopEventsPort, TrailRuntimeEvent};
pub use gates::{AlwaysActive, DeadlineGate, ManualGate, ManualGateSwitch, ProcessGate};
pub use lines::{EofPolicy, LineTransport};
pub use metrics::{NoopMetrics, RecordingMetrics};
pub use queue::{MemoryQueue, QueuePublisher};
