use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, warn};

use trail_engine::decode::millis_to_datetime;
use trail_engine::{decode, select, ApplyOutcome, RendererPort, Selection, TrailState};

use super::context::CliContext;
use super::output::RenderFormat;
use super::session::{build_renderer, TrailOverrides};

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// NDJSON file with one lifecycle event per line
    pub file: PathBuf,

    /// Instant open fetches are drawn up to (RFC3339 or epoch millis);
    /// defaults to the latest timestamp in the file
    #[arg(long)]
    pub now: Option<String>,

    /// How the snapshot is drawn
    #[arg(long, value_enum, default_value = "text")]
    pub format: RenderFormat,

    /// Write the snapshot to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub trail: TrailOverrides,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub lines: usize,
    pub applied: usize,
    pub rejected: usize,
    pub orphaned: usize,
    pub latest: Option<DateTime<Utc>>,
}

/// Applies every line of `feed` to `state`, skipping malformed ones.
/// Lines are decoded as raw bytes so one line of binary junk does not sink
/// the whole file.
pub fn replay_lines(feed: &[u8], state: &mut TrailState, key_max_len: usize) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for (idx, line) in feed.split(|b| *b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        summary.lines += 1;
        match decode(line, key_max_len) {
            Ok(event) => {
                summary.latest = Some(match summary.latest {
                    Some(latest) if latest >= event.timestamp => latest,
                    _ => event.timestamp,
                });
                match state.apply(&event) {
                    ApplyOutcome::OrphanEnd => summary.orphaned += 1,
                    _ => summary.applied += 1,
                }
            }
            Err(err) => {
                warn!(line = idx + 1, %err, "skipping malformed lifecycle event");
                summary.rejected += 1;
            }
        }
    }
    summary
}

pub fn parse_now(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return millis_to_datetime(millis).context("Invalid --now timestamp");
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("--now must be RFC3339 or epoch milliseconds, got {raw:?}"))
}

pub async fn cmd_replay(args: ReplayArgs, ctx: &CliContext) -> Result<()> {
    let policy = args.trail.apply(&ctx.config().trail)?;
    let feed = fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let mut state = TrailState::new(policy.closed_capacity);
    let summary = replay_lines(&feed, &mut state, policy.key_max_len);
    debug!(?summary, "replay applied");

    let now = match (&args.now, summary.latest) {
        (Some(raw), _) => parse_now(raw)?,
        (None, Some(latest)) => latest,
        (None, None) => bail!("{} holds no usable lifecycle events", args.file.display()),
    };

    let renderer = build_renderer(args.format, &policy.title, args.output.as_deref())?;
    match select(&state, now, policy.window_size) {
        Selection::NoData => eprintln!("nothing to draw: every event was rejected or orphaned"),
        Selection::Window(snapshot) => renderer
            .render(&snapshot)
            .await
            .context("Failed to draw snapshot")?,
    }
    eprintln!(
        "replayed {} lines: {} applied, {} rejected, {} orphan ends",
        summary.lines, summary.applied, summary.rejected, summary.orphaned
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trail_engine::fixtures::SAMPLE_EVENTS;

    #[test]
    fn replay_counts_every_outcome() {
        let mut text = SAMPLE_EVENTS.join("\n");
        text.push_str("\n\n{broken\n");
        text.push_str(r#"{"eventType":"END","url":"http://ghost/","timestamp":1}"#);
        let mut state = TrailState::new(100);
        let summary = replay_lines(text.as_bytes(), &mut state, 50);
        assert_eq!(summary.lines, 6);
        assert_eq!(summary.applied, 4);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.orphaned, 1);
        assert_eq!(summary.latest.unwrap().timestamp_millis(), 1_444_002_262_613);
        assert_eq!(state.closed_len(), 2);
    }

    #[test]
    fn binary_line_is_rejected_without_losing_the_rest() {
        let mut feed = Vec::new();
        for (idx, event) in SAMPLE_EVENTS.iter().enumerate() {
            if idx == 2 {
                feed.extend_from_slice(b"\xff\xfe\x00\n");
            }
            feed.extend_from_slice(event.as_bytes());
            feed.extend_from_slice(b"\r\n");
        }
        let mut state = TrailState::new(100);
        let summary = replay_lines(&feed, &mut state, 50);
        assert_eq!(summary.lines, 5);
        assert_eq!(summary.applied, 4);
        assert_eq!(summary.rejected, 1);
        assert_eq!(state.closed_len(), 2);
    }

    #[test]
    fn now_accepts_millis_and_rfc3339() {
        assert_eq!(parse_now("1000").unwrap().timestamp_millis(), 1000);
        assert_eq!(
            parse_now("2015-10-04T23:44:22.613Z")
                .unwrap()
                .timestamp_millis(),
            1_444_002_262_613
        );
        assert!(parse_now("yesterday").is_err());
    }
}
