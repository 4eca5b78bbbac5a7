use thiserror::Error;

/// Failures talking to the text-generation service
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response from generation service: {0}")]
    Malformed(String),

    #[error("Generation service returned no text")]
    EmptyResponse,

    #[error("Generation service did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Email not found")]
    NotFound,

    #[error("Missing required fields: to, subject, body")]
    MissingFields,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the compose client
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode server response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
