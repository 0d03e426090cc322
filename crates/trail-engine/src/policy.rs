use crate::errors::{TrailError, TrailResult};
use crawltrail_core_types::DEFAULT_KEY_MAX_LEN;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Session parameters for one monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrailPolicyView {
    pub window_size: usize,
    pub batch_ceiling: usize,
    pub poll_interval_ms: u64,
    pub pull_timeout_ms: u64,
    pub closed_capacity: usize,
    pub key_max_len: usize,
    pub title: String,
}

impl Default for TrailPolicyView {
    fn default() -> Self {
        Self {
            window_size: 25,
            batch_ceiling: 250,
            poll_interval_ms: 1_000,
            pull_timeout_ms: 1_000,
            closed_capacity: 10_000,
            key_max_len: DEFAULT_KEY_MAX_LEN,
            title: "crawl".to_string(),
        }
    }
}

impl TrailPolicyView {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pull_timeout(&self) -> Duration {
        Duration::from_millis(self.pull_timeout_ms)
    }

    pub fn validate(&self) -> TrailResult<()> {
        let checks: [(&str, bool); 5] = [
            ("window_size", self.window_size == 0),
            ("batch_ceiling", self.batch_ceiling == 0),
            ("pull_timeout_ms", self.pull_timeout_ms == 0),
            ("closed_capacity", self.closed_capacity == 0),
            ("key_max_len", self.key_max_len == 0),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, bad)| *bad) {
            return Err(TrailError::InvalidArg(format!("{field} must be positive")));
        }
        if self.closed_capacity < self.window_size {
            return Err(TrailError::InvalidArg(format!(
                "closed_capacity ({}) must be at least window_size ({})",
                self.closed_capacity, self.window_size
            )));
        }
        Ok(())
    }
}

static GLOBAL_POLICY: OnceCell<Arc<RwLock<TrailPolicyView>>> = OnceCell::new();

fn policy_cell() -> Arc<RwLock<TrailPolicyView>> {
    GLOBAL_POLICY
        .get_or_init(|| Arc::new(RwLock::new(TrailPolicyView::default())))
        .clone()
}

#[derive(Clone)]
pub struct TrailPolicyHandle {
    inner: Arc<RwLock<TrailPolicyView>>,
}

impl TrailPolicyHandle {
    pub fn new_with(view: TrailPolicyView) -> Self {
        Self {
            inner: Arc::new(RwLock::new(view)),
        }
    }

    pub fn global() -> Self {
        Self {
            inner: policy_cell(),
        }
    }

    pub fn snapshot(&self) -> TrailPolicyView {
        self.inner.read().clone()
    }

    pub fn update(&self, view: TrailPolicyView) -> TrailResult<()> {
        view.validate()?;
        *self.inner.write() = view;
        Ok(())
    }
}

pub fn set_policy(view: TrailPolicyView) -> TrailResult<()> {
    TrailPolicyHandle::global().update(view)
}

pub fn current_policy() -> TrailPolicyView {
    TrailPolicyHandle::global().snapshot()
}
