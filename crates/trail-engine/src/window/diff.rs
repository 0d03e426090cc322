use crate::model::WindowSnapshot;
use crawltrail_core_types::UrlKey;
use std::collections::BTreeSet;

/// Row-level difference between two consecutive draws. Renderers use it to
/// remove stale rows and add new ones instead of clearing the surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<UrlKey>,
    pub removed: Vec<UrlKey>,
    pub kept: Vec<UrlKey>,
}

impl SnapshotDiff {
    pub fn between(prev: Option<&WindowSnapshot>, next: &WindowSnapshot) -> Self {
        let before: BTreeSet<&UrlKey> = prev
            .map(|snap| snap.segments.iter().map(|s| &s.key).collect())
            .unwrap_or_default();
        let after: BTreeSet<&UrlKey> = next.segments.iter().map(|s| &s.key).collect();

        Self {
            added: after.difference(&before).map(|k| (*k).clone()).collect(),
            removed: before.difference(&after).map(|k| (*k).clone()).collect(),
            kept: after.intersection(&before).map(|k| (*k).clone()).collect(),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
