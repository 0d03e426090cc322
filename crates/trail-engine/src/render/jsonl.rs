use crate::errors::{TrailError, TrailResult};
use crate::model::WindowSnapshot;
use crate::ports::RendererPort;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
struct SnapshotLine<'a> {
    #[serde(rename = "type")]
    line_type: &'static str,
    title: &'a str,
    seq: u64,
    #[serde(flatten)]
    snapshot: &'a WindowSnapshot,
}

struct Sink {
    writer: Box<dyn Write + Send>,
    seq: u64,
}

/// Writes every snapshot as one JSON line, for piping into another
/// drawing surface or keeping a record of the session.
pub struct JsonlRenderer {
    title: String,
    sink: Mutex<Sink>,
}

impl JsonlRenderer {
    pub fn new(title: impl Into<String>, writer: Box<dyn Write + Send>) -> Self {
        Self {
            title: title.into(),
            sink: Mutex::new(Sink { writer, seq: 0 }),
        }
    }

    pub fn stdout(title: impl Into<String>) -> Self {
        Self::new(title, Box::new(std::io::stdout()))
    }

    pub fn create(title: impl Into<String>, path: impl AsRef<Path>) -> TrailResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self::new(title, Box::new(BufWriter::new(file))))
    }
}

pub fn serialize_snapshot(title: &str, seq: u64, snapshot: &WindowSnapshot) -> TrailResult<String> {
    serde_json::to_string(&SnapshotLine {
        line_type: "snapshot",
        title,
        seq,
        snapshot,
    })
    .map_err(|err| TrailError::Render(err.to_string()))
}

#[async_trait]
impl RendererPort for JsonlRenderer {
    async fn render(&self, snapshot: &WindowSnapshot) -> TrailResult<()> {
        let mut sink = self.sink.lock();
        sink.seq += 1;
        let line = serialize_snapshot(&self.title, sink.seq, snapshot)?;
        sink.writer
            .write_all(line.as_bytes())
            .and_then(|_| sink.writer.write_all(b"\n"))
            .and_then(|_| sink.writer.flush())
            .map_err(|err| TrailError::Render(err.to_string()))
    }
}
