use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The queue's consumer has shut down.
    #[error("Dispatch queue {0} is closed")]
    QueueClosed(&'static str),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
