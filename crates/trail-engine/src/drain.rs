//! The polling / draining / rendering cycle that drives a monitoring session.
//!
//! One cycle runs to completion before the next begins, so the trail state
//! has a single owner and needs no locking. The loop yields only while
//! waiting on the transport (bounded by the pull timeout) and during the
//! inter-cycle sleep.

use crate::decode::decode;
use crate::errors::{TrailError, TrailResult};
use crate::model::{
    ApplyOutcome, CycleReport, DrainState, Pulled, RawMessage, Selection, SessionReport,
    StopReason,
};
use crate::policy::TrailPolicyView;
use crate::ports::{
    Clock, EventsPort, MetricLabels, MetricsPort, ProgressGate, RendererPort, TransportPort,
};
use crate::state::TrailState;
use crate::window::select;
use crawltrail_core_types::SessionId;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const METRIC_MESSAGES: &str = "trail_messages_total";
pub const METRIC_CYCLES: &str = "trail_cycles_total";
pub const METRIC_EVICTIONS: &str = "trail_evictions_total";
pub const METRIC_OPEN: &str = "trail_open_entries";
pub const METRIC_CLOSED: &str = "trail_closed_entries";
pub const METRIC_CYCLE_MS: &str = "trail_cycle_ms";

pub(crate) struct DrainParts {
    pub transport: Arc<dyn TransportPort>,
    pub gate: Arc<dyn ProgressGate>,
    pub renderer: Arc<dyn RendererPort>,
    pub events: Arc<dyn EventsPort>,
    pub metrics: Arc<dyn MetricsPort>,
    pub clock: Arc<dyn Clock>,
    pub policy: TrailPolicyView,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    cycles: u64,
    messages: u64,
    rejected: u64,
    orphaned: u64,
}

pub struct DrainLoop {
    session: SessionId,
    trail: TrailState,
    state: DrainState,
    transport: Arc<dyn TransportPort>,
    gate: Arc<dyn ProgressGate>,
    renderer: Arc<dyn RendererPort>,
    events: Arc<dyn EventsPort>,
    metrics: Arc<dyn MetricsPort>,
    clock: Arc<dyn Clock>,
    policy: TrailPolicyView,
    totals: Totals,
    released: bool,
}

impl DrainLoop {
    pub(crate) fn from_parts(parts: DrainParts) -> Self {
        Self {
            session: SessionId::new(),
            trail: TrailState::new(parts.policy.closed_capacity),
            state: DrainState::Idle,
            transport: parts.transport,
            gate: parts.gate,
            renderer: parts.renderer,
            events: parts.events,
            metrics: parts.metrics,
            clock: parts.clock,
            policy: parts.policy,
            totals: Totals::default(),
            released: false,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn state(&self) -> DrainState {
        self.state
    }

    pub fn trail(&self) -> &TrailState {
        &self.trail
    }

    pub fn policy(&self) -> &TrailPolicyView {
        &self.policy
    }

    pub fn cycles(&self) -> u64 {
        self.totals.cycles
    }

    /// Runs cycles until the progress gate reports the job finished, the
    /// token is cancelled, or the transport fails. The transport is closed
    /// exactly once on every one of those paths.
    pub async fn run(&mut self, cancel: CancellationToken) -> TrailResult<SessionReport> {
        if self.released {
            return Err(TrailError::InvalidArg(
                "drain loop already ran; build a new one per session".into(),
            ));
        }
        info!(
            session = %self.session,
            window = self.policy.window_size,
            batch = self.policy.batch_ceiling,
            poll_ms = self.policy.poll_interval_ms,
            "trail session started"
        );

        let outcome = self.cycle_until_stop(&cancel).await;

        self.transport.close().await;
        self.released = true;
        self.state = DrainState::Stopped;

        match outcome {
            Ok(stop) => {
                let report = SessionReport {
                    session: self.session.clone(),
                    cycles: self.totals.cycles,
                    messages: self.totals.messages,
                    rejected: self.totals.rejected,
                    orphaned: self.totals.orphaned,
                    stop,
                };
                info!(
                    session = %report.session,
                    cycles = report.cycles,
                    messages = report.messages,
                    rejected = report.rejected,
                    stop = ?report.stop,
                    "trail session stopped"
                );
                self.events.session_stopped(&report);
                Ok(report)
            }
            Err(err) => {
                error!(
                    session = %self.session,
                    %err,
                    cycles = self.totals.cycles,
                    "trail session aborted"
                );
                Err(err)
            }
        }
    }

    async fn cycle_until_stop(&mut self, cancel: &CancellationToken) -> TrailResult<StopReason> {
        loop {
            if cancel.is_cancelled() {
                return Ok(StopReason::Cancelled);
            }
            self.state = DrainState::Polling;
            if !self.gate.progress().await {
                debug!("progress gate reports the crawl job inactive");
                return Ok(StopReason::JobFinished);
            }

            self.run_cycle().await?;

            self.state = DrainState::Polling;
            tokio::select! {
                _ = cancel.cancelled() => return Ok(StopReason::Cancelled),
                _ = sleep(self.policy.poll_interval()) => {}
            }
        }
    }

    /// One Draining -> Rendering pass. Only transport failures surface as
    /// errors; malformed messages and renderer failures are absorbed.
    pub async fn run_cycle(&mut self) -> TrailResult<CycleReport> {
        let started = Instant::now();
        let evicted_before = self.trail.evicted_total();
        let mut report = CycleReport::default();

        self.state = DrainState::Draining;
        while report.pulled < self.policy.batch_ceiling {
            match self.transport.pull(self.policy.pull_timeout()).await? {
                Pulled::Empty => {
                    report.drained_early = true;
                    break;
                }
                Pulled::Message(raw) => {
                    report.pulled += 1;
                    self.totals.messages += 1;
                    self.ingest(&raw, &mut report);
                }
            }
        }
        report.evicted = (self.trail.evicted_total() - evicted_before) as usize;

        self.state = DrainState::Rendering;
        match select(&self.trail, self.clock.now(), self.policy.window_size) {
            Selection::NoData => debug!("no lifecycle events yet; skipping draw"),
            Selection::Window(snapshot) => match self.renderer.render(&snapshot).await {
                Ok(()) => report.rendered = true,
                Err(err) => warn!(%err, "renderer failed; continuing"),
            },
        }

        self.totals.cycles += 1;
        self.record_cycle(&report, started);
        self.events.cycle_completed(self.totals.cycles, &report);
        debug!(
            cycle = self.totals.cycles,
            pulled = report.pulled,
            applied = report.applied,
            rejected = report.rejected,
            drained_early = report.drained_early,
            "cycle complete"
        );
        Ok(report)
    }

    fn ingest(&mut self, raw: &RawMessage, report: &mut CycleReport) {
        let event = match decode(raw.as_bytes(), self.policy.key_max_len) {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, "skipping malformed lifecycle event");
                report.rejected += 1;
                self.totals.rejected += 1;
                self.metrics.inc(METRIC_MESSAGES, outcome_label("rejected"));
                self.events.message_rejected(&err);
                return;
            }
        };

        match self.trail.apply(&event) {
            ApplyOutcome::OrphanEnd => {
                report.orphaned += 1;
                self.totals.orphaned += 1;
                self.metrics.inc(METRIC_MESSAGES, outcome_label("orphan"));
                self.events.orphan_end(event.key.as_str());
            }
            _ => {
                report.applied += 1;
                self.metrics.inc(METRIC_MESSAGES, outcome_label("applied"));
            }
        }
    }

    fn record_cycle(&self, report: &CycleReport, started: Instant) {
        self.metrics.inc(METRIC_CYCLES, MetricLabels::new());
        for _ in 0..report.evicted {
            self.metrics.inc(METRIC_EVICTIONS, MetricLabels::new());
        }
        self.metrics.gauge(METRIC_OPEN, self.trail.open_len() as f64);
        self.metrics.gauge(METRIC_CLOSED, self.trail.closed_len() as f64);
        self.metrics
            .observe_ms(METRIC_CYCLE_MS, started.elapsed().as_millis() as u64);
    }
}

fn outcome_label(outcome: &str) -> MetricLabels {
    let mut labels = MetricLabels::new();
    labels.insert("outcome".to_string(), outcome.to_string());
    labels
}
