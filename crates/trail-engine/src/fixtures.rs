//! Canned lifecycle messages for demos and smoke tests: two fetches that
//! start four milliseconds apart and finish about half a second later.

use crate::model::RawMessage;

pub const SAMPLE_EVENTS: [&str; 4] = [
    r#"{"eventType":"START","eventData":{},"url":"http://www.google.com/","timestamp":1444002262091}"#,
    r#"{"eventType":"START","eventData":{},"url":"http://aron.ahmadia.net/","timestamp":1444002262095}"#,
    r#"{"eventType":"END","eventData":{"status":"success"},"url":"http://www.google.com/","timestamp":1444002262604}"#,
    r#"{"eventType":"END","eventData":{"status":"success"},"url":"http://aron.ahmadia.net/","timestamp":1444002262613}"#,
];

pub fn sample_messages() -> Vec<RawMessage> {
    SAMPLE_EVENTS.iter().map(|body| RawMessage::new(*body)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::model::EventKind;

    #[test]
    fn samples_decode_in_order() {
        let kinds: Vec<EventKind> = sample_messages()
            .iter()
            .map(|raw| decode(raw.as_bytes(), 50).unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::Start, EventKind::Start, EventKind::End, EventKind::End]
        );
    }
}
