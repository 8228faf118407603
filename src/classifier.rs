//! Driver error classification.
//!
//! Maps raw SQLSTATE codes to the fault taxonomy with a single data-driven
//! table per driver, keyed by the current operation phase: a uniqueness
//! violation means "stream already exists" while a stream is being created,
//! but "concurrent duplicate append" during a later append.

use crate::error::StoreError;
use crate::stream::StreamName;

/// SQLSTATE reported by drivers when nothing actually failed; compensation
/// paths treat it as benign.
pub const BENIGN_SQLSTATE: &str = "00000";

/// SQLSTATE for "no data": a result set that produced no effective rows.
pub const NO_ROWS_SQLSTATE: &str = "02000";

/// Supported driver families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Mysql,
    Postgres,
}

impl Driver {
    /// Codes signalling a duplicate key on the stream's unique constraints.
    fn duplicate_codes(self) -> &'static [&'static str] {
        match self {
            Driver::Mysql => &["23000"],
            Driver::Postgres => &["23000", "23505"],
        }
    }

    /// Code signalling that the stream's physical table does not exist.
    fn missing_table_code(self) -> &'static str {
        match self {
            Driver::Mysql => "42S02",
            Driver::Postgres => "42P01",
        }
    }
}

/// Extract the SQLSTATE from a driver error, if any.
pub fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Whether a driver error carries the benign "no error" sentinel.
pub fn is_benign(err: &sqlx::Error) -> bool {
    sqlstate(err).as_deref() == Some(BENIGN_SQLSTATE)
}

/// Classify a raw driver error raised on the connection boundary.
pub fn classify(
    driver: Driver,
    err: &sqlx::Error,
    during_creation: bool,
    stream: &StreamName,
) -> StoreError {
    let code = sqlstate(err);

    match code.as_deref() {
        Some(c) if during_creation && driver.duplicate_codes().contains(&c) => {
            StoreError::StreamAlreadyExists(stream.to_string())
        }
        Some(c) if c == driver.missing_table_code() => {
            StoreError::StreamNotFound(stream.to_string())
        }
        Some(c) if driver.duplicate_codes().contains(&c) => StoreError::Concurrency(format!(
            "concurrent append to stream {stream} rejected: {err}"
        )),
        _ => StoreError::QueryFailure {
            code,
            message: err.to_string(),
        },
    }
}

/// Classify a driver error surfaced while iterating a read result.
///
/// The designated "no effective rows" code maps to `StreamNotFound`; every
/// other code goes through the regular table.
pub fn classify_read(driver: Driver, err: &sqlx::Error, stream: &StreamName) -> StoreError {
    if sqlstate(err).as_deref() == Some(NO_ROWS_SQLSTATE) {
        return StoreError::StreamNotFound(stream.to_string());
    }

    classify(driver, err, false, stream)
}
