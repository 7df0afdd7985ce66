/// Errors surfaced by the coordination layer.
///
/// The type is `Clone` because a single outcome of a deduplicated fetch is
/// handed to every waiter of that key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Backend failure: {0}")]
    Backend(String),
    #[error("In-flight fetch was aborted before settling")]
    FetchAborted,
    #[error("Queued task panicked")]
    TaskPanicked,
    #[error("Request queue dropped the task before it completed")]
    QueueClosed,
}

impl Error {
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
