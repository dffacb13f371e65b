use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// All errors produced by the relay.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied input was rejected before touching any backend
    /// (empty text, empty file, session code too short).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The transfer store could not be reached or refused the operation.
    #[error("transfer store unavailable: {0}")]
    StoreUnavailable(#[source] BoxError),

    /// The blob store could not be reached or refused the operation.
    #[error("blob store unavailable: {0}")]
    BlobUnavailable(#[source] BoxError),

    /// A record breaks the file/text exclusivity invariant.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// No record with the given id exists.
    #[error("transfer not found: {0}")]
    NotFound(String),

    /// Settings could not be loaded or are out of range.
    #[error("configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Error::InvalidRecord(msg.into())
    }

    pub fn store(err: impl Into<BoxError>) -> Self {
        Error::StoreUnavailable(err.into())
    }

    pub fn blob(err: impl Into<BoxError>) -> Self {
        Error::BlobUnavailable(err.into())
    }

    pub fn config(err: impl std::fmt::Display) -> Self {
        Error::Config(err.to_string())
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::BlobUnavailable(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::store(e)
    }
}

impl From<surrealdb::Error> for Error {
    fn from(e: surrealdb::Error) -> Self {
        Error::store(e)
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::config(e)
    }
}

#[macro_export]
macro_rules! input_bail {
    ( $fmt:literal $(, $($arg:tt)*)?) => {
        return Err($crate::error::Error::invalid_input(format!($fmt $(, $($arg)*)?)))
    };
}

#[macro_export]
macro_rules! record_bail {
    ( $fmt:literal $(, $($arg:tt)*)?) => {
        return Err($crate::error::Error::invalid_record(format!($fmt $(, $($arg)*)?)))
    };
}
