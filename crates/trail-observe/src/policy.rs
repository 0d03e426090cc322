use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObsPolicyView {
    pub enable_metrics: bool,
    pub enable_tracing: bool,
    /// Serve `/metrics` over HTTP. Off unless asked for; a monitor session
    /// is usually a short-lived foreground process.
    pub prom_enable: bool,
    pub prom_bind: String,
    /// Distinct label sets kept per metric name before new ones are dropped.
    pub series_limit: usize,
    pub label_value_max: usize,
    pub json_logs: bool,
}

impl Default for ObsPolicyView {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            enable_tracing: true,
            prom_enable: false,
            prom_bind: "127.0.0.1:9898".into(),
            series_limit: 256,
            label_value_max: 64,
            json_logs: false,
        }
    }
}

static GLOBAL_POLICY: OnceCell<Arc<RwLock<ObsPolicyView>>> = OnceCell::new();

#[derive(Clone)]
pub struct PolicyHandle {
    inner: Arc<RwLock<ObsPolicyView>>,
}

impl PolicyHandle {
    pub fn get() -> Self {
        let cell = GLOBAL_POLICY.get_or_init(|| Arc::new(RwLock::new(ObsPolicyView::default())));
        Self {
            inner: Arc::clone(cell),
        }
    }

    pub fn snapshot(&self) -> ObsPolicyView {
        self.inner.read().clone()
    }

    pub fn update(&self, view: ObsPolicyView) {
        *self.inner.write() = view;
    }
}

pub fn set_policy(view: ObsPolicyView) {
    PolicyHandle::get().update(view);
}

pub fn current_policy() -> ObsPolicyView {
    PolicyHandle::get().snapshot()
}
