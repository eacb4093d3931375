use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Setup failures. Anything that goes wrong *during* an attempt is classified
/// into an [`AttemptOutcome`](crate::tools::fetch::AttemptOutcome) instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("failed to build client: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    pub fn config(reason: impl Into<String>) -> Self {
        FetchError::InvalidConfig(reason.into())
    }

    pub fn header(name: &str, reason: impl ToString) -> Self {
        FetchError::InvalidHeader {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/* Conversions so `?` works smoothly */
impl From<url::ParseError> for FetchError {
    fn from(e: url::ParseError) -> Self {
        FetchError::InvalidUrl(e.to_string())
    }
}
