use crate::errors::TrailResult;
use crate::model::WindowSnapshot;
use crate::ports::RendererPort;
use async_trait::async_trait;
use tracing::{debug, info};

/// Emits each snapshot through `tracing` instead of drawing it. Useful when
/// the monitor runs headless next to a log collector.
pub struct LogRenderer {
    title: String,
}

impl LogRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[async_trait]
impl RendererPort for LogRenderer {
    async fn render(&self, snapshot: &WindowSnapshot) -> TrailResult<()> {
        info!(
            title = %self.title,
            segments = snapshot.segments.len(),
            markers = snapshot.markers.len(),
            open = snapshot.open_total,
            closed = snapshot.closed_total,
            from = %snapshot.bounds.min,
            to = %snapshot.bounds.max,
            "trail snapshot"
        );
        for segment in &snapshot.segments {
            debug!(
                key = %segment.key,
                start = %segment.start,
                end = %segment.end,
                closed = segment.closed,
                "segment"
            );
        }
        Ok(())
    }
}
