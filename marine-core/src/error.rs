use thiserror::Error;

/// Error taxonomy shared by every Marine component.
///
/// Server-side component errors convert into this type when they need to be
/// reported in a uniform way (logs, API responses).
#[derive(Error, Debug)]
pub enum MarineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Remote error (status {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Parse failure: {0}")]
    Parse(String),

    #[error("No URLs submitted.")]
    EmptyQueue,
}

pub type Result<T> = std::result::Result<T, MarineError>;
