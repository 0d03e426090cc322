use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Args;
use tokio::time::sleep;
use tracing::{info, warn};

use trail_engine::adapters::{ManualGate, MemoryQueue};
use trail_engine::fixtures::{sample_messages, SAMPLE_EVENTS};
use trail_engine::{FixedClock, TrailMonitorBuilder};

use super::context::CliContext;
use super::output::RenderFormat;
use super::session::{build_renderer, cancel_on_ctrl_c, run_session};
use crate::metrics::ObserveMetrics;

/// Drawing instant for the sample crawl: shortly after both fetches end.
const DEMO_NOW_MS: i64 = 1_444_002_262_700;

#[derive(Args, Clone, Debug)]
pub struct DemoArgs {
    /// How snapshots are drawn
    #[arg(long, value_enum, default_value = "text")]
    pub format: RenderFormat,

    /// Pause between cycles
    #[arg(long, default_value = "200ms", value_parser = humantime::parse_duration)]
    pub interval: Duration,
}

/// Publishes the two START events, lets a cycle draw them as open, then
/// publishes the END events and finishes the fake crawl job.
pub async fn cmd_demo(args: DemoArgs, ctx: &CliContext) -> Result<()> {
    let mut policy = ctx.config().trail.clone();
    policy.poll_interval_ms = args.interval.as_millis() as u64;
    policy.pull_timeout_ms = policy.pull_timeout_ms.min(policy.poll_interval_ms.max(1));

    let (publisher, queue) = MemoryQueue::channel(16);
    let (switch, gate) = ManualGate::channel();
    let clock = Utc
        .timestamp_millis_opt(DEMO_NOW_MS)
        .single()
        .map(FixedClock)
        .ok_or_else(|| anyhow::anyhow!("demo clock out of range"))?;

    let renderer = build_renderer(args.format, &policy.title, None)?;
    let monitor = TrailMonitorBuilder::new()
        .with_policy(policy)
        .with_transport(Arc::new(queue))
        .with_gate(Arc::new(gate))
        .with_renderer(renderer)
        .with_metrics(Arc::new(ObserveMetrics))
        .with_clock(Arc::new(clock))
        .build()?;

    let interval = args.interval;
    let feeder = tokio::spawn(async move {
        let messages = sample_messages();
        let (starts, ends) = messages.split_at(2);
        for phase in [starts, ends] {
            for message in phase {
                if let Err(err) = publisher.publish(message.body.clone()).await {
                    warn!(%err, "demo feed stopped early");
                    break;
                }
            }
            sleep(interval * 2).await;
        }
        switch.finish();
    });

    info!(events = SAMPLE_EVENTS.len(), "Running demo crawl");
    let outcome = run_session(monitor, cancel_on_ctrl_c(), "demo").await;
    feeder.abort();
    outcome.map(|_| ())
}
