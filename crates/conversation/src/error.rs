use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed parameter. Rendered as the bare message.
    #[error("{0}")]
    Validation(String),

    /// The remote service answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Service {
        service: &'static str,
        status: u16,
        body: Value,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status to report for this error in a `{code, message}` envelope.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Service { status, .. } => *status,
            _ => 500,
        }
    }
}

impl From<relay_common::Error> for Error {
    fn from(err: relay_common::Error) -> Self {
        match err {
            relay_common::Error::Validation(message) => Self::Validation(message),
            other => Self::Message {
                message: other.to_string(),
            },
        }
    }
}

impl relay_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

relay_common::impl_context!();
