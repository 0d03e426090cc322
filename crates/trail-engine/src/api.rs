use crate::adapters::{AlwaysActive, NoopEventsPort, NoopMetrics};
use crate::drain::{DrainLoop, DrainParts};
use crate::errors::{TrailError, TrailResult};
use crate::policy::{current_policy, TrailPolicyView};
use crate::ports::{
    Clock, EventsPort, MetricsPort, ProgressGate, RendererPort, SystemClock, TransportPort,
};
use std::sync::Arc;

/// Assembles a [`DrainLoop`] from its ports. Transport and renderer are
/// required; everything else falls back to a quiet default.
pub struct TrailMonitorBuilder {
    policy: Option<TrailPolicyView>,
    transport: Option<Arc<dyn TransportPort>>,
    gate: Option<Arc<dyn ProgressGate>>,
    renderer: Option<Arc<dyn RendererPort>>,
    events: Option<Arc<dyn EventsPort>>,
    metrics: Option<Arc<dyn MetricsPort>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for TrailMonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrailMonitorBuilder {
    pub fn new() -> Self {
        Self {
            policy: None,
            transport: None,
            gate: None,
            renderer: None,
            events: None,
            metrics: None,
            clock: None,
        }
    }

    pub fn with_policy(mut self, policy: TrailPolicyView) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_transport(mut self, port: Arc<dyn TransportPort>) -> Self {
        self.transport = Some(port);
        self
    }

    pub fn with_gate(mut self, port: Arc<dyn ProgressGate>) -> Self {
        self.gate = Some(port);
        self
    }

    pub fn with_renderer(mut self, port: Arc<dyn RendererPort>) -> Self {
        self.renderer = Some(port);
        self
    }

    pub fn with_events(mut self, port: Arc<dyn EventsPort>) -> Self {
        self.events = Some(port);
        self
    }

    pub fn with_metrics(mut self, port: Arc<dyn MetricsPort>) -> Self {
        self.metrics = Some(port);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> TrailResult<DrainLoop> {
        let policy = self.policy.unwrap_or_else(current_policy);
        policy.validate()?;
        let transport = self
            .transport
            .ok_or_else(|| TrailError::InvalidArg("transport port is required".into()))?;
        let renderer = self
            .renderer
            .ok_or_else(|| TrailError::InvalidArg("renderer port is required".into()))?;

        Ok(DrainLoop::from_parts(DrainParts {
            transport,
            gate: self.gate.unwrap_or_else(|| Arc::new(AlwaysActive)),
            renderer,
            events: self.events.unwrap_or_else(|| Arc::new(NoopEventsPort)),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            policy,
        }))
    }
}
