//! Error kinds surfaced by the exchange core.

use thiserror::Error;

/// Result type alias for exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Concrete reasons a field-name translation cannot complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationFailure {
    /// Two input fields landed on the same output name.
    #[error("field collision on '{0}'")]
    FieldCollision(String),

    /// The supplied context is not a field-name mapping.
    #[error("invalid context: {0}")]
    InvalidContext(String),
}

/// Errors that can occur while importing, exporting or receiving entities
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("an entity titled '{0}' already exists")]
    DuplicateTitle(String),

    #[error("an entity with id '{0}' already exists")]
    DuplicateId(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown peer platform: {0}")]
    UnknownPeer(String),

    #[error("malformed package: {0}")]
    MalformedPackage(String),

    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),

    #[error("translation failed: {0}")]
    Translation(#[from] TranslationFailure),

    #[error("seed data error: {0}")]
    Seed(String),

    #[error("package build error: {0}")]
    Package(String),
}

impl From<zip::result::ZipError> for ExchangeError {
    fn from(err: zip::result::ZipError) -> Self {
        ExchangeError::MalformedPackage(err.to_string())
    }
}
