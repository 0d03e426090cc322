use crate::errors::{TrailError, TrailResult};
use crate::model::{Pulled, RawMessage};
use crate::ports::TransportPort;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Default)]
struct LinkState {
    severed: AtomicBool,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

/// In-process queue standing in for the broker. The crawler side holds a
/// [`QueuePublisher`]; the monitoring session pulls from the [`MemoryQueue`].
pub struct MemoryQueue {
    rx: Mutex<mpsc::Receiver<RawMessage>>,
    link: Arc<LinkState>,
}

#[derive(Clone)]
pub struct QueuePublisher {
    tx: mpsc::Sender<RawMessage>,
    link: Arc<LinkState>,
}

impl MemoryQueue {
    pub fn channel(capacity: usize) -> (QueuePublisher, MemoryQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let link = Arc::new(LinkState::default());
        (
            QueuePublisher {
                tx,
                link: Arc::clone(&link),
            },
            MemoryQueue {
                rx: Mutex::new(rx),
                link,
            },
        )
    }

    pub fn is_closed(&self) -> bool {
        self.link.closed.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.link.close_calls.load(Ordering::SeqCst)
    }
}

impl QueuePublisher {
    pub async fn publish(&self, body: impl Into<Vec<u8>>) -> TrailResult<()> {
        self.tx
            .send(RawMessage::new(body))
            .await
            .map_err(|_| TrailError::Transport("queue consumer is gone".into()))
    }

    pub fn try_publish(&self, body: impl Into<Vec<u8>>) -> TrailResult<()> {
        self.tx
            .try_send(RawMessage::new(body))
            .map_err(|err| TrailError::Transport(format!("queue rejected message: {err}")))
    }

    /// Simulates losing the broker connection; the consumer's next pull fails.
    pub fn sever(&self) {
        self.link.severed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportPort for MemoryQueue {
    async fn pull(&self, timeout: Duration) -> TrailResult<Pulled> {
        if self.link.severed.load(Ordering::SeqCst) {
            return Err(TrailError::Transport("queue connection lost".into()));
        }
        if self.is_closed() {
            return Err(TrailError::Transport("queue already released".into()));
        }
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(message)) => Ok(Pulled::Message(message)),
            // every publisher dropped: nothing more will arrive, same as idle
            Ok(None) => Ok(Pulled::Empty),
            Err(_) => Ok(Pulled::Empty),
        }
    }

    async fn close(&self) {
        self.link.close_calls.fetch_add(1, Ordering::SeqCst);
        self.link.closed.store(true, Ordering::SeqCst);
        self.rx.lock().await.close();
    }
}
