use crate::adapters::gates::ManualGateSwitch;
use crate::errors::{TrailError, TrailResult};
use crate::model::{Pulled, RawMessage};
use crate::ports::TransportPort;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

type BoxedReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// What reaching the end of the stream means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofPolicy {
    /// The producer may append more later (a tailed file, a pipe).
    Idle,
    /// The peer hung up; the feed is gone.
    Disconnect,
}

/// Newline-delimited JSON feed: one lifecycle event per line.
///
/// Lines are handed on as raw bytes; a line that is not valid UTF-8 is a
/// bad message for the decoder, not a broken feed.
pub struct LineTransport {
    lines: Mutex<Option<Split<BoxedReader>>>,
    eof: EofPolicy,
    source: String,
    on_eof: Option<ManualGateSwitch>,
}

impl LineTransport {
    pub fn new<R>(reader: R, eof: EofPolicy, source: impl Into<String>) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        let boxed: BoxedReader = Box::new(reader);
        Self {
            lines: Mutex::new(Some(boxed.split(b'\n'))),
            eof,
            source: source.into(),
            on_eof: None,
        }
    }

    /// Flips `switch` the first time an idle feed reaches end of input, so
    /// a one-shot file session can end once everything has been read.
    pub fn with_eof_switch(mut self, switch: ManualGateSwitch) -> Self {
        self.on_eof = Some(switch);
        self
    }

    pub async fn open_file(path: impl AsRef<Path>) -> TrailResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        info!(path = %path.display(), "opened event feed file");
        Ok(Self::new(
            BufReader::new(file),
            EofPolicy::Idle,
            path.display().to_string(),
        ))
    }

    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), EofPolicy::Idle, "stdin")
    }

    pub async fn connect_tcp(addr: &str) -> TrailResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|err| TrailError::Transport(format!("connect {addr}: {err}")))?;
        info!(%addr, "connected to event feed");
        Ok(Self::new(
            BufReader::new(stream),
            EofPolicy::Disconnect,
            format!("tcp://{addr}"),
        ))
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[async_trait]
impl TransportPort for LineTransport {
    async fn pull(&self, timeout: Duration) -> TrailResult<Pulled> {
        let mut guard = self.lines.lock().await;
        let Some(lines) = guard.as_mut() else {
            return Err(TrailError::Transport(format!(
                "{} already released",
                self.source
            )));
        };

        // next_segment is cancel safe, so a timeout never loses a partial line
        let next = tokio::time::timeout(timeout, async {
            loop {
                match lines.next_segment().await {
                    Ok(Some(line)) if is_blank(&line) => continue,
                    Ok(Some(mut line)) => {
                        if line.last() == Some(&b'\r') {
                            line.pop();
                        }
                        return Ok(Some(line));
                    }
                    other => return other,
                }
            }
        })
        .await;

        match next {
            Err(_) => Ok(Pulled::Empty),
            Ok(Ok(Some(line))) => Ok(Pulled::Message(RawMessage::new(line))),
            Ok(Ok(None)) => match self.eof {
                EofPolicy::Idle => {
                    if let Some(switch) = &self.on_eof {
                        switch.finish();
                    }
                    Ok(Pulled::Empty)
                }
                EofPolicy::Disconnect => Err(TrailError::Transport(format!(
                    "{} closed the feed",
                    self.source
                ))),
            },
            Ok(Err(err)) => Err(TrailError::Transport(format!(
                "{} read failed: {err}",
                self.source
            ))),
        }
    }

    async fn close(&self) {
        if self.lines.lock().await.take().is_some() {
            debug!(source = %self.source, "released event feed");
        }
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}
