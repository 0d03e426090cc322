//! On-disk configuration for the `crawltrail` binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use trail_engine::TrailPolicyView;
use trail_observe::ObsPolicyView;

pub const ENV_WINDOW_SIZE: &str = "CRAWLTRAIL_WINDOW_SIZE";
pub const ENV_BATCH_CEILING: &str = "CRAWLTRAIL_BATCH_CEILING";
pub const ENV_POLL_INTERVAL_MS: &str = "CRAWLTRAIL_POLL_INTERVAL_MS";
pub const ENV_PULL_TIMEOUT_MS: &str = "CRAWLTRAIL_PULL_TIMEOUT_MS";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub trail: TrailPolicyView,
    pub observe: ObsPolicyView,
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Failed to parse config file")
    }

    /// Applies `CRAWLTRAIL_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<Vec<&'static str>> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<Vec<&'static str>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        if let Some(v) = parse_var(&lookup, ENV_WINDOW_SIZE)? {
            self.trail.window_size = v as usize;
            applied.push(ENV_WINDOW_SIZE);
        }
        if let Some(v) = parse_var(&lookup, ENV_BATCH_CEILING)? {
            self.trail.batch_ceiling = v as usize;
            applied.push(ENV_BATCH_CEILING);
        }
        if let Some(v) = parse_var(&lookup, ENV_POLL_INTERVAL_MS)? {
            self.trail.poll_interval_ms = v;
            applied.push(ENV_POLL_INTERVAL_MS);
        }
        if let Some(v) = parse_var(&lookup, ENV_PULL_TIMEOUT_MS)? {
            self.trail.pull_timeout_ms = v;
            applied.push(ENV_PULL_TIMEOUT_MS);
        }
        Ok(applied)
    }

    pub fn validate(&self) -> Result<()> {
        self.trail
            .validate()
            .context("Invalid trail settings in configuration")
    }
}

fn parse_var<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{key} must be a non-negative integer, got {raw:?}")),
    }
}
