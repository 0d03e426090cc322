//! Raw queue payload -> [`LifecycleEvent`].
//!
//! The crawler publishes one JSON object per fetch transition:
//!
//! ```json
//! {"eventType":"END","eventData":{"status":"success"},"url":"http://example.com/","timestamp":1444002262604}
//! ```

use crate::errors::{TrailError, TrailResult};
use crate::model::{EventKind, LifecycleEvent};
use chrono::{DateTime, TimeZone, Utc};
use crawltrail_core_types::UrlKey;
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Deserialize)]
struct WireEvent {
    url: Option<String>,
    #[serde(rename = "eventType")]
    event_type: Option<String>,
    timestamp: Option<JsonValue>,
    #[serde(rename = "eventData", default)]
    event_data: Option<JsonValue>,
}

pub fn decode(raw: &[u8], key_max_len: usize) -> TrailResult<LifecycleEvent> {
    let wire: WireEvent = serde_json::from_slice(raw)
        .map_err(|err| TrailError::MalformedEvent(format!("payload is not a JSON object: {err}")))?;

    let url = match wire.url {
        Some(url) if !url.is_empty() => url,
        Some(_) => return Err(TrailError::MalformedEvent("url is empty".into())),
        None => return Err(TrailError::MalformedEvent("missing url".into())),
    };

    let kind = match wire.event_type.as_deref() {
        Some(tag) => parse_kind(tag)?,
        None => return Err(TrailError::MalformedEvent("missing eventType".into())),
    };

    let timestamp = match wire.timestamp {
        Some(value) => parse_epoch_millis(&value)?,
        None => return Err(TrailError::MalformedEvent("missing timestamp".into())),
    };

    let status = wire
        .event_data
        .as_ref()
        .and_then(|data| data.get("status"))
        .and_then(JsonValue::as_str)
        .map(str::to_owned);

    Ok(LifecycleEvent {
        key: UrlKey::normalize(&url, key_max_len),
        url,
        kind,
        timestamp,
        status,
    })
}

pub fn decode_str(raw: &str, key_max_len: usize) -> TrailResult<LifecycleEvent> {
    decode(raw.as_bytes(), key_max_len)
}

fn parse_kind(tag: &str) -> TrailResult<EventKind> {
    if tag.eq_ignore_ascii_case("start") {
        Ok(EventKind::Start)
    } else if tag.eq_ignore_ascii_case("end") {
        Ok(EventKind::End)
    } else {
        Err(TrailError::MalformedEvent(format!(
            "unexpected eventType {tag:?}"
        )))
    }
}

/// Java-style epoch milliseconds to a UTC instant.
pub fn parse_epoch_millis(value: &JsonValue) -> TrailResult<DateTime<Utc>> {
    let millis = value
        .as_i64()
        .ok_or_else(|| TrailError::MalformedEvent(format!("timestamp {value} is not an integer")))?;
    millis_to_datetime(millis)
}

pub fn millis_to_datetime(millis: i64) -> TrailResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| TrailError::MalformedEvent(format!("timestamp {millis} out of range")))
}
