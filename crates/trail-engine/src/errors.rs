use crawltrail_core_types::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrailError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("malformed lifecycle event: {0}")]
    MalformedEvent(String),
    #[error("transport unavailable: {0}")]
    Transport(String),
    #[error("renderer failed: {0}")]
    Render(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrailError {
    /// True when the session cannot usefully continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrailError::Transport(_) | TrailError::Internal(_) | TrailError::Io(_)
        )
    }
}

impl From<TrailError> for CoreError {
    fn from(value: TrailError) -> Self {
        CoreError::new(value.to_string())
    }
}

pub type TrailResult<T> = Result<T, TrailError>;
