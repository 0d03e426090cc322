use crate::policy::current_policy;
use std::collections::BTreeMap;

pub type LabelMap = BTreeMap<String, String>;

/// Makes labels safe to print in the Prometheus text format: keys reduced
/// to `[a-zA-Z0-9_]`, values escaped and clipped to the policy length.
pub fn sanitize_labels(kv: LabelMap) -> LabelMap {
    let max_len = current_policy().label_value_max;
    kv.into_iter()
        .filter_map(|(key, value)| {
            let key = sanitize_key(&key)?;
            Some((key, sanitize_value(&value, max_len)))
        })
        .collect()
}

fn sanitize_key(key: &str) -> Option<String> {
    let cleaned: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        Some(format!("_{cleaned}"))
    } else {
        Some(cleaned.to_string())
    }
}

fn sanitize_value(value: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(value.len().min(max_len));
    for c in value.chars().take(max_len) {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}
