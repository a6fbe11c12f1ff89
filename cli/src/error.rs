use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error("DER decode error: {0}")]
    Der(#[from] der::error::Error),

    #[error("PEM decode error: {0}")]
    Pem(#[from] pem::error::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0:?} is a directory")]
    IsDirectory(String),

    /// Bad arguments; the command help is shown after the message.
    #[error("{0}")]
    Usage(String),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
