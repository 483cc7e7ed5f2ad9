use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The identity provider refused the authorization code.
    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("the default store is not found for owner '{owner}'")]
    NoDefaultStore { owner: String },

    #[error("Please sign in first")]
    MustSignIn,
}

pub type Result<T> = std::result::Result<T, Error>;
