use thiserror::Error;

/// Outcome of a successful classification. `Unsafe` is a verdict, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Unsafe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    Transient,
    Fatal,
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classification service is rate limiting requests")]
    RateLimited,
    #[error("image could not be downloaded: {0}")]
    DownloadFailed(String),
    #[error("malformed verdict payload: {0}")]
    Malformed(String),
    #[error("classification service responded with status {0}")]
    Status(u16),
    #[error("classification request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
}

impl ClassifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassifyError::RateLimited => ErrorKind::RateLimited,
            ClassifyError::Timeout | ClassifyError::Network(_) => ErrorKind::Transient,
            ClassifyError::DownloadFailed(_)
            | ClassifyError::Malformed(_)
            | ClassifyError::Status(_) => ErrorKind::Fatal,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClassifyError::Timeout
        } else {
            ClassifyError::Network(err)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueSnapshot {
    pub queued: usize,
    pub admitted: usize,
}
