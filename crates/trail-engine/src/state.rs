use crate::model::{ApplyOutcome, ClosedEntry, EventKind, LifecycleEvent, OpenEntry};
use chrono::{DateTime, Utc};
use crawltrail_core_types::UrlKey;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Open and closed fetches for one monitoring session.
///
/// A key lives in at most one of the two maps. Closed entries are capped at
/// `closed_capacity`; every close evicts the entries with the oldest end
/// time once the cap is exceeded.
#[derive(Debug)]
pub struct TrailState {
    open: HashMap<UrlKey, OpenEntry>,
    closed: HashMap<UrlKey, ClosedEntry>,
    closed_by_end: BTreeSet<(DateTime<Utc>, UrlKey)>,
    closed_capacity: usize,
    evicted_total: u64,
}

impl TrailState {
    pub fn new(closed_capacity: usize) -> Self {
        Self {
            open: HashMap::new(),
            closed: HashMap::new(),
            closed_by_end: BTreeSet::new(),
            closed_capacity: closed_capacity.max(1),
            evicted_total: 0,
        }
    }

    pub fn apply(&mut self, event: &LifecycleEvent) -> ApplyOutcome {
        match event.kind {
            EventKind::Start => self.apply_start(&event.key, event.timestamp),
            EventKind::End => self.apply_end(&event.key, event.timestamp),
        }
    }

    fn apply_start(&mut self, key: &UrlKey, at: DateTime<Utc>) -> ApplyOutcome {
        let reopened = self.remove_closed(key).is_some();
        let previous = self.open.insert(
            key.clone(),
            OpenEntry {
                key: key.clone(),
                start: at,
            },
        );
        match (previous, reopened) {
            (Some(_), _) => ApplyOutcome::Restarted,
            (None, true) => ApplyOutcome::Reopened,
            (None, false) => ApplyOutcome::Opened,
        }
    }

    fn apply_end(&mut self, key: &UrlKey, at: DateTime<Utc>) -> ApplyOutcome {
        let Some(open) = self.open.remove(key) else {
            debug!(key = %key, end = %at, "ignoring end without matching start");
            return ApplyOutcome::OrphanEnd;
        };
        if at < open.start {
            debug!(key = %key, start = %open.start, end = %at, "end precedes start");
        }
        self.closed_by_end.insert((at, key.clone()));
        self.closed.insert(
            key.clone(),
            ClosedEntry {
                key: key.clone(),
                start: open.start,
                end: at,
            },
        );
        self.enforce_capacity();
        ApplyOutcome::Closed
    }

    /// Drops the oldest-completed entries until the closed map fits its
    /// capacity. Returns how many were removed.
    pub fn enforce_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.closed.len() > self.closed_capacity {
            let Some((_, key)) = self.closed_by_end.pop_first() else {
                break;
            };
            self.closed.remove(&key);
            evicted += 1;
        }
        self.evicted_total += evicted as u64;
        evicted
    }

    fn remove_closed(&mut self, key: &UrlKey) -> Option<ClosedEntry> {
        let entry = self.closed.remove(key)?;
        self.closed_by_end.remove(&(entry.end, entry.key.clone()));
        Some(entry)
    }

    pub fn open(&self) -> &HashMap<UrlKey, OpenEntry> {
        &self.open
    }

    pub fn closed(&self) -> &HashMap<UrlKey, ClosedEntry> {
        &self.closed
    }

    pub fn get_open(&self, key: &UrlKey) -> Option<&OpenEntry> {
        self.open.get(key)
    }

    pub fn get_closed(&self, key: &UrlKey) -> Option<&ClosedEntry> {
        self.closed.get(key)
    }

    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    pub fn closed_len(&self) -> usize {
        self.closed.len()
    }

    pub fn len(&self) -> usize {
        self.open.len() + self.closed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.closed.is_empty()
    }

    pub fn closed_capacity(&self) -> usize {
        self.closed_capacity
    }

    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }
}

impl Default for TrailState {
    fn default() -> Self {
        Self::new(crate::policy::TrailPolicyView::default().closed_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ev(url: &str, kind: EventKind, ms: i64) -> LifecycleEvent {
        LifecycleEvent {
            url: url.to_string(),
            key: UrlKey::normalize(url, 50),
            kind,
            timestamp: Utc.timestamp_millis_opt(ms).unwrap(),
            status: None,
        }
    }

    fn key(url: &str) -> UrlKey {
        UrlKey::normalize(url, 50)
    }

    #[test]
    fn repeated_start_is_last_write_wins() {
        let mut state = TrailState::new(16);
        assert_eq!(state.apply(&ev("a", EventKind::Start, 1_000)), ApplyOutcome::Opened);
        assert_eq!(
            state.apply(&ev("a", EventKind::Start, 1_100)),
            ApplyOutcome::Restarted
        );
        assert_eq!(state.open_len(), 1);
        assert_eq!(
            state.get_open(&key("a")).unwrap().start.timestamp_millis(),
            1_100
        );
    }

    #[test]
    fn orphan_end_changes_nothing() {
        let mut state = TrailState::new(16);
        assert_eq!(state.apply(&ev("c", EventKind::End, 500)), ApplyOutcome::OrphanEnd);
        assert!(state.is_empty());
    }

    #[test]
    fn end_moves_entry_to_closed() {
        let mut state = TrailState::new(16);
        state.apply(&ev("a", EventKind::Start, 1_000));
        assert_eq!(state.apply(&ev("a", EventKind::End, 1_020)), ApplyOutcome::Closed);
        assert!(state.get_open(&key("a")).is_none());
        let closed = state.get_closed(&key("a")).unwrap();
        assert_eq!(closed.start.timestamp_millis(), 1_000);
        assert_eq!(closed.end.timestamp_millis(), 1_020);
    }

    #[test]
    fn duplicate_end_is_orphan() {
        let mut state = TrailState::new(16);
        state.apply(&ev("a", EventKind::Start, 1_000));
        state.apply(&ev("a", EventKind::End, 1_020));
        assert_eq!(state.apply(&ev("a", EventKind::End, 1_030)), ApplyOutcome::OrphanEnd);
        assert_eq!(
            state.get_closed(&key("a")).unwrap().end.timestamp_millis(),
            1_020
        );
    }

    #[test]
    fn restart_of_closed_key_leaves_closed_map() {
        let mut state = TrailState::new(16);
        state.apply(&ev("a", EventKind::Start, 1_000));
        state.apply(&ev("a", EventKind::End, 1_020));
        assert_eq!(
            state.apply(&ev("a", EventKind::Start, 2_000)),
            ApplyOutcome::Reopened
        );
        assert!(state.get_closed(&key("a")).is_none());
        assert_eq!(state.open_len(), 1);
        assert_eq!(state.enforce_capacity(), 0);
    }

    #[test]
    fn capacity_evicts_oldest_end_first() {
        let mut state = TrailState::new(2);
        for (url, start, end) in [("a", 0, 300), ("b", 10, 100), ("c", 20, 200)] {
            state.apply(&ev(url, EventKind::Start, start));
            state.apply(&ev(url, EventKind::End, end));
        }
        assert_eq!(state.closed_len(), 2);
        assert!(state.get_closed(&key("b")).is_none());
        assert!(state.get_closed(&key("a")).is_some());
        assert!(state.get_closed(&key("c")).is_some());
        assert_eq!(state.evicted_total(), 1);
    }

    #[test]
    fn keys_never_in_both_maps() {
        let mut state = TrailState::new(4);
        let script = [
            ("a", EventKind::Start, 1),
            ("b", EventKind::End, 2),
            ("a", EventKind::End, 3),
            ("a", EventKind::Start, 4),
            ("b", EventKind::Start, 5),
            ("b", EventKind::End, 6),
            ("a", EventKind::End, 7),
            ("a", EventKind::End, 8),
            ("c", EventKind::Start, 9),
        ];
        for (url, kind, ms) in script {
            state.apply(&ev(url, kind, ms));
            for k in state.open().keys() {
                assert!(!state.closed().contains_key(k), "{k} in both maps");
            }
        }
    }
}
