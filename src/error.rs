use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure to retrieve a listing document. Never fatal: the watcher logs it
/// and treats the poll as having returned zero listings.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("response body was not valid JSON: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_))
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

/// Failure to hand a message to the chat API.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("chat API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("chat transport failure: {0}")]
    Transport(#[source] reqwest::Error),
}

pub type DeliveryResult = std::result::Result<(), DeliveryError>;
