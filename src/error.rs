//! Event store fault taxonomy.
//!
//! Raw driver errors never leave this crate: every `sqlx::Error` raised on
//! the connection boundary passes through the classifier first
//! (see `crate::classifier`), so callers only ever observe these variants.

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during event store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The stream is not registered in the catalog, or its table produced
    /// no rows / does not exist.
    #[error("stream {0} not found")]
    StreamNotFound(String),

    /// A stream with this name was already registered while creating it.
    #[error("stream {0} already exists")]
    StreamAlreadyExists(String),

    /// A concurrent appender won the race: lock acquisition failed or the
    /// database rejected a duplicate append.
    #[error("concurrency violation: {0}")]
    Concurrency(String),

    /// Unclassified database failure, carrying the original driver code
    /// and message.
    #[error("query failure ({}): {message}", .code.as_deref().unwrap_or("no code"))]
    QueryFailure {
        code: Option<String>,
        message: String,
    },

    /// `begin_transaction` was called while a transaction was open.
    #[error("transaction already started")]
    TransactionAlreadyStarted,

    /// `commit_transaction` or `rollback_transaction` was called with no
    /// open transaction.
    #[error("transaction not started")]
    TransactionNotStarted,

    /// An event could not be converted to or from its stored row shape.
    /// Not a database fault; never produced by the classifier.
    #[error("event conversion failed: {0}")]
    Conversion(String),
}

impl StoreError {
    /// Wrap a raw driver error as an unclassified query failure.
    pub fn query_failure(err: &sqlx::Error) -> Self {
        let code = match err {
            sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
            _ => None,
        };
        StoreError::QueryFailure {
            code,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Conversion(err.to_string())
    }
}
