//! Shared wiring for commands that drive a monitoring session.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};

use trail_engine::render::{JsonlRenderer, LogRenderer, TextRenderer};
use trail_engine::{DrainLoop, RendererPort, SessionReport, TrailPolicyView};

use super::output::RenderFormat;

/// Command-line overrides layered over the configured trail policy.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct TrailOverrides {
    /// Maximum number of rows in the drawn window
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Maximum messages pulled per cycle
    #[arg(long)]
    pub batch_ceiling: Option<usize>,

    /// Pause between cycles (e.g. 500ms, 2s)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub poll_interval: Option<std::time::Duration>,

    /// How long a single pull waits for a message
    #[arg(long, value_parser = humantime::parse_duration)]
    pub pull_timeout: Option<std::time::Duration>,

    /// Chart title
    #[arg(long)]
    pub title: Option<String>,
}

impl TrailOverrides {
    pub fn apply(&self, base: &TrailPolicyView) -> Result<TrailPolicyView> {
        let mut policy = base.clone();
        if let Some(v) = self.window_size {
            policy.window_size = v;
        }
        if let Some(v) = self.batch_ceiling {
            policy.batch_ceiling = v;
        }
        if let Some(v) = self.poll_interval {
            policy.poll_interval_ms = v.as_millis() as u64;
        }
        if let Some(v) = self.pull_timeout {
            policy.pull_timeout_ms = v.as_millis() as u64;
        }
        if let Some(title) = &self.title {
            policy.title = title.clone();
        }
        if policy.closed_capacity < policy.window_size {
            policy.closed_capacity = policy.window_size;
        }
        policy.validate().context("Invalid trail settings")?;
        Ok(policy)
    }
}

pub fn build_renderer(
    format: RenderFormat,
    title: &str,
    output: Option<&Path>,
) -> Result<Arc<dyn RendererPort>> {
    let renderer: Arc<dyn RendererPort> = match (format, output) {
        (RenderFormat::Log, _) => Arc::new(LogRenderer::new(title)),
        (RenderFormat::Jsonl, Some(path)) => Arc::new(
            JsonlRenderer::create(title, path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        (RenderFormat::Jsonl, None) => Arc::new(JsonlRenderer::stdout(title)),
        (RenderFormat::Text, Some(path)) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Arc::new(TextRenderer::new(title, Box::new(file)))
        }
        (RenderFormat::Text, None) => Arc::new(TextRenderer::stdout(title)),
    };
    Ok(renderer)
}

/// Token cancelled on the first Ctrl-C; the loop stops between cycles.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; stopping after the current cycle");
            trigger.cancel();
        }
    });
    token
}

pub async fn run_session(
    mut monitor: DrainLoop,
    cancel: CancellationToken,
    source: &str,
) -> Result<SessionReport> {
    let span = trail_observe::tracing::session_span(&monitor.policy().title, source);
    let report = monitor
        .run(cancel)
        .instrument(span)
        .await
        .context("Monitoring session failed")?;
    eprintln!(
        "session {} finished ({:?}): {} cycles, {} messages, {} rejected, {} orphan ends",
        report.session, report.stop, report.cycles, report.messages, report.rejected, report.orphaned
    );
    Ok(report)
}
