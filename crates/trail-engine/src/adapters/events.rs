use crate::errors::TrailError;
use crate::model::{CycleReport, SessionReport};
use crate::ports::EventsPort;
use crawltrail_event_bus::EventBus;
use std::sync::Arc;
use tokio::spawn;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrailRuntimeEvent {
    CycleCompleted { cycle: u64, report: CycleReport },
    MessageRejected { reason: String },
    OrphanEnd { key: String },
    SessionStopped { report: SessionReport },
}

#[derive(Default)]
pub struct NoopEventsPort;

impl EventsPort for NoopEventsPort {
    fn cycle_completed(&self, _cycle: u64, _report: &CycleReport) {}

    fn message_rejected(&self, _err: &TrailError) {}

    fn orphan_end(&self, _key: &str) {}

    fn session_stopped(&self, _report: &SessionReport) {}
}

pub struct BusEventsPort {
    bus: Arc<dyn EventBus<TrailRuntimeEvent> + Send + Sync>,
}

impl BusEventsPort {
    pub fn new(bus: Arc<dyn EventBus<TrailRuntimeEvent> + Send + Sync>) -> Self {
        Self { bus }
    }

    fn publish(&self, event: TrailRuntimeEvent) {
        let bus = Arc::clone(&self.bus);
        spawn(async move {
            if let Err(err) = bus.publish(event).await {
                warn!(?err, "trail event bus publish failed");
            }
        });
    }
}

impl EventsPort for BusEventsPort {
    fn cycle_completed(&self, cycle: u64, report: &CycleReport) {
        self.publish(TrailRuntimeEvent::CycleCompleted {
            cycle,
            report: report.clone(),
        });
    }

    fn message_rejected(&self, err: &TrailError) {
        self.publish(TrailRuntimeEvent::MessageRejected {
            reason: err.to_string(),
        });
    }

    fn orphan_end(&self, key: &str) {
        self.publish(TrailRuntimeEvent::OrphanEnd {
            key: key.to_string(),
        });
    }

    fn session_stopped(&self, report: &SessionReport) {
        self.publish(TrailRuntimeEvent::SessionStopped {
            report: report.clone(),
        });
    }
}
