use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Longest key the axis labels of the trail chart can hold.
pub const DEFAULT_KEY_MAX_LEN: usize = 50;

/// Shared error type for the CrawlTrail crates.
#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("{message}")]
    Message { message: String },
}

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identifies one monitoring session (one crawl job being watched).
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render-safe identifier derived from a fetched URL.
///
/// Two different URLs may normalise to the same key (long URLs sharing a
/// prefix, `a-b` vs `a_b`). The trail treats the last writer as the owner
/// of a colliding key.
#[cfg_attr(
    feature = "serde-full",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct UrlKey(String);

impl UrlKey {
    /// Builds a key from a raw URL: scheme prefixes removed, `:` and `-`
    /// replaced with `_`, and the result cut to `max_len` characters.
    pub fn normalize(url: &str, max_len: usize) -> Self {
        let stripped = url.replace("https://", "").replace("http://", "");
        let key: String = stripped
            .chars()
            .map(|c| match c {
                ':' | '-' => '_',
                other => other,
            })
            .take(max_len)
            .collect();
        Self(key)
    }

    /// Wraps an already-normalised key without touching it.
    pub fn from_normalized(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for UrlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UrlKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
