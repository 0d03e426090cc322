use crate::errors::{TrailError, TrailResult};
use crate::model::WindowSnapshot;
use crate::ports::RendererPort;
use crate::window::SnapshotDiff;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::Write;

const DEFAULT_BAR_WIDTH: usize = 60;

struct TextState {
    writer: Box<dyn Write + Send>,
    previous: Option<WindowSnapshot>,
}

/// Terminal trail chart: one row per visible URL, a bar from fetch start to
/// fetch end (or now), and `o` where a visible completion marker lands.
pub struct TextRenderer {
    title: String,
    bar_width: usize,
    state: Mutex<TextState>,
}

impl TextRenderer {
    pub fn new(title: impl Into<String>, writer: Box<dyn Write + Send>) -> Self {
        Self {
            title: title.into(),
            bar_width: DEFAULT_BAR_WIDTH,
            state: Mutex::new(TextState {
                writer,
                previous: None,
            }),
        }
    }

    pub fn stdout(title: impl Into<String>) -> Self {
        Self::new(title, Box::new(std::io::stdout()))
    }

    pub fn with_bar_width(mut self, width: usize) -> Self {
        self.bar_width = width.max(2);
        self
    }
}

#[async_trait]
impl RendererPort for TextRenderer {
    async fn render(&self, snapshot: &WindowSnapshot) -> TrailResult<()> {
        let mut state = self.state.lock();
        let diff = SnapshotDiff::between(state.previous.as_ref(), snapshot);
        let mut out = render_chart(&self.title, snapshot, self.bar_width);
        let _ = writeln!(
            out,
            "rows +{} -{} ={}",
            diff.added.len(),
            diff.removed.len(),
            diff.kept.len()
        );
        state
            .writer
            .write_all(out.as_bytes())
            .and_then(|_| state.writer.flush())
            .map_err(|err| TrailError::Render(err.to_string()))?;
        state.previous = Some(snapshot.clone());
        Ok(())
    }
}

pub fn render_chart(title: &str, snapshot: &WindowSnapshot, bar_width: usize) -> String {
    let bar_width = bar_width.max(2);
    let label_width = snapshot
        .segments
        .iter()
        .map(|s| s.key.as_str().chars().count())
        .max()
        .unwrap_or(0);
    let marked: HashSet<&str> = snapshot.markers.iter().map(|m| m.key.as_str()).collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {title} | {} .. {} | open {} closed {}",
        snapshot.bounds.min.format("%H:%M:%S%.3f"),
        snapshot.bounds.max.format("%H:%M:%S%.3f"),
        snapshot.open_total,
        snapshot.closed_total,
    );

    for segment in &snapshot.segments {
        let from = column(segment.start, snapshot, bar_width);
        let to = column(segment.end, snapshot, bar_width).max(from);
        let mut bar = vec![' '; bar_width];
        for cell in bar.iter_mut().take(to + 1).skip(from) {
            *cell = '=';
        }
        bar[to] = if !segment.closed {
            '>'
        } else if marked.contains(segment.key.as_str()) {
            'o'
        } else {
            '|'
        };
        let bar: String = bar.into_iter().collect();
        let _ = writeln!(
            out,
            "{:<label_width$} |{}| {}ms",
            segment.key.as_str(),
            bar,
            (segment.end - segment.start).num_milliseconds(),
        );
    }
    out
}

fn column(at: DateTime<Utc>, snapshot: &WindowSnapshot, bar_width: usize) -> usize {
    let span = (snapshot.bounds.max - snapshot.bounds.min).num_milliseconds();
    if span <= 0 {
        return 0;
    }
    let offset = (at - snapshot.bounds.min).num_milliseconds().clamp(0, span);
    let scaled = offset as f64 / span as f64 * (bar_width - 1) as f64;
    (scaled.round() as usize).min(bar_width - 1)
}
