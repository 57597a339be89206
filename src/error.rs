use std::time::Duration;

use thiserror::Error;

/// Error type for transaction manager operations
///
/// `E` is the error type of the underlying [`Database`](crate::backend::Database).
/// Driver failures are carried unchanged and can be recovered with
/// [`TxnError::into_source`].
#[derive(Debug, Error)]
pub enum TxnError<E>
where
    E: std::error::Error + 'static,
{
    /// A terminal operation was invoked after the transaction tree finished
    #[error("transaction already ended")]
    AlreadyEnded,

    /// The database failed to start a physical transaction
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] E),

    /// The physical commit failed
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] E),

    /// The physical rollback failed
    #[error("failed to rollback transaction: {0}")]
    Rollback(#[source] E),

    /// A statement failed
    #[error("statement failed: {0}")]
    Statement(#[source] E),

    /// A statement did not complete before its deadline
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),
}

impl<E> TxnError<E>
where
    E: std::error::Error + 'static,
{
    /// Unwrap the driver error, if this error came from the driver
    pub fn into_source(self) -> Option<E> {
        match self {
            TxnError::Begin(e)
            | TxnError::Commit(e)
            | TxnError::Rollback(e)
            | TxnError::Statement(e) => Some(e),
            TxnError::AlreadyEnded | TxnError::Timeout(_) => None,
        }
    }

    pub fn is_already_ended(&self) -> bool {
        matches!(self, TxnError::AlreadyEnded)
    }
}

/// Result type for transaction manager operations
pub type Result<T, E> = std::result::Result<T, TxnError<E>>;

/// Error type for loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("{0} environment variable not found")]
    MissingVar(&'static str),

    /// An environment variable holds a value that cannot be parsed
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("driver: {0}")]
    struct DriverError(&'static str);

    #[test]
    fn test_into_source_returns_driver_error() {
        let err: TxnError<DriverError> = TxnError::Commit(DriverError("disk full"));
        assert_eq!(err.to_string(), "failed to commit transaction: driver: disk full");
        assert_eq!(err.into_source(), Some(DriverError("disk full")));
    }

    #[test]
    fn test_already_ended_has_no_source() {
        let err: TxnError<DriverError> = TxnError::AlreadyEnded;
        assert!(err.is_already_ended());
        assert_eq!(err.to_string(), "transaction already ended");
        assert!(err.into_source().is_none());
    }
}
