use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use trail_engine::adapters::{
    AlwaysActive, DeadlineGate, LineTransport, ManualGate, ProcessGate,
};
use trail_engine::{ProgressGate, TrailMonitorBuilder, TransportPort};

use super::context::CliContext;
use super::output::RenderFormat;
use super::session::{build_renderer, cancel_on_ctrl_c, run_session, TrailOverrides};
use crate::metrics::ObserveMetrics;

#[derive(Args, Clone, Debug)]
pub struct WatchArgs {
    /// Event feed: an NDJSON file, `-` for stdin, or tcp://host:port
    #[arg(long, short = 's')]
    pub source: String,

    /// Keep waiting for new lines after reaching the end of a file or stdin
    #[arg(long)]
    pub follow: bool,

    /// Launch the crawl job and stop when it exits
    #[arg(long, value_name = "CMD", conflicts_with = "duration")]
    pub crawl_cmd: Option<String>,

    /// Stop after this long (e.g. 10m)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// How snapshots are drawn
    #[arg(long, value_enum, default_value = "text")]
    pub format: RenderFormat,

    /// Write snapshots to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub trail: TrailOverrides,
}

/// Where lifecycle events come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Stdin,
    File(PathBuf),
    Tcp(String),
}

impl FeedSource {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("--source must not be empty");
        }
        if raw == "-" {
            return Ok(FeedSource::Stdin);
        }
        if let Some(addr) = raw.strip_prefix("tcp://") {
            if addr.is_empty() {
                bail!("tcp source needs host:port");
            }
            return Ok(FeedSource::Tcp(addr.to_string()));
        }
        Ok(FeedSource::File(PathBuf::from(raw)))
    }

    fn ends_on_eof(&self) -> bool {
        !matches!(self, FeedSource::Tcp(_))
    }
}

pub async fn cmd_watch(args: WatchArgs, ctx: &CliContext) -> Result<()> {
    let policy = args.trail.apply(&ctx.config().trail)?;
    let source = FeedSource::parse(&args.source)?;
    let one_shot = source.ends_on_eof()
        && !args.follow
        && args.crawl_cmd.is_none()
        && args.duration.is_none();

    let mut feed = match &source {
        FeedSource::Stdin => LineTransport::stdin(),
        FeedSource::File(path) => LineTransport::open_file(path)
            .await
            .with_context(|| format!("Failed to open event feed {}", path.display()))?,
        FeedSource::Tcp(addr) => LineTransport::connect_tcp(addr).await?,
    };
    let label = feed.source().to_string();

    let gate: Arc<dyn ProgressGate> = if let Some(cmd) = &args.crawl_cmd {
        Arc::new(ProcessGate::spawn_command_line(cmd)?)
    } else if let Some(duration) = args.duration {
        Arc::new(DeadlineGate::after(duration))
    } else if one_shot {
        let (switch, gate) = ManualGate::channel();
        feed = feed.with_eof_switch(switch);
        Arc::new(gate)
    } else {
        Arc::new(AlwaysActive)
    };
    let transport: Arc<dyn TransportPort> = Arc::new(feed);

    let renderer = build_renderer(args.format, &policy.title, args.output.as_deref())?;
    let monitor = TrailMonitorBuilder::new()
        .with_policy(policy)
        .with_transport(transport)
        .with_gate(gate)
        .with_renderer(renderer)
        .with_metrics(Arc::new(ObserveMetrics))
        .build()?;

    info!(source = %label, one_shot, "Watching crawl lifecycle feed");
    run_session(monitor, cancel_on_ctrl_c(), &label).await?;
    Ok(())
}
