use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObserveError {
    #[error("invalid bind address {addr}: {reason}")]
    BadBind { addr: String, reason: String },
    #[error("metrics listener failed: {0}")]
    Listener(#[from] std::io::Error),
    #[error("tracing already initialised elsewhere")]
    SubscriberTaken,
}

pub type ObserveResult<T> = Result<T, ObserveError>;
