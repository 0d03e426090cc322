use crate::model::{CompletionMarker, Segment, Selection, TimeBounds, WindowSnapshot};
use crate::state::TrailState;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Computes the visible window: up to `limit` segments ordered by most
/// recent start, plus up to `limit` completion markers ordered by most
/// recent end.
///
/// The two truncations are independent. A segment can be visible while its
/// marker is not, and the other way round.
pub fn select(state: &TrailState, now: DateTime<Utc>, limit: usize) -> Selection {
    if state.is_empty() || limit == 0 {
        return Selection::NoData;
    }

    let mut segments: Vec<Segment> = Vec::with_capacity(state.len());
    segments.extend(state.open().values().map(|entry| Segment {
        key: entry.key.clone(),
        start: entry.start,
        end: now,
        closed: false,
    }));
    segments.extend(state.closed().values().map(|entry| Segment {
        key: entry.key.clone(),
        start: entry.start,
        end: entry.end,
        closed: true,
    }));
    segments.sort_by(newest_start_first);
    segments.truncate(limit);

    let mut markers: Vec<CompletionMarker> = state
        .closed()
        .values()
        .map(|entry| CompletionMarker {
            key: entry.key.clone(),
            end: entry.end,
        })
        .collect();
    markers.sort_by(newest_end_first);
    markers.truncate(limit);

    let Some(bounds) = bounds_of(&segments) else {
        return Selection::NoData;
    };

    Selection::Window(WindowSnapshot {
        generated_at: now,
        segments,
        markers,
        bounds,
        open_total: state.open_len(),
        closed_total: state.closed_len(),
    })
}

fn newest_start_first(a: &Segment, b: &Segment) -> Ordering {
    b.start.cmp(&a.start).then_with(|| a.key.cmp(&b.key))
}

fn newest_end_first(a: &CompletionMarker, b: &CompletionMarker) -> Ordering {
    b.end.cmp(&a.end).then_with(|| a.key.cmp(&b.key))
}

fn bounds_of(segments: &[Segment]) -> Option<TimeBounds> {
    let min = segments.iter().map(|s| s.start).min()?;
    let max = segments.iter().map(|s| s.end).max()?;
    Some(TimeBounds { min, max })
}
