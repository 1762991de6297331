use thiserror::Error;

#[derive(Error, Debug)]
pub enum InteractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("edit error: {0}")]
    Edit(#[from] EditError),

    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("no edit event with id {0}")]
    UnknownEvent(String),

    #[error("edit event {0} is already finalized")]
    EventFinalized(String),

    #[error("edit event {0} changed type")]
    TypeMismatch(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded")]
    QuotaExceeded,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerError {
    #[error("connectivity worker disconnected")]
    Disconnected,

    #[error("connectivity computation failed: {0}")]
    Failed(String),
}
