//! Write lock strategies.
//!
//! A write lock serializes concurrent appenders to one stream table. The
//! bracket covers exactly the insert statement, and every statement of
//! the bracket runs on the same session, keeping session-scoped locks on
//! the connection that acquired them.

mod advisory;
mod no_lock;
mod row_lock;

pub use advisory::AdvisoryWriteLock;
pub use no_lock::NoWriteLock;
pub use row_lock::RowWriteLock;

use async_trait::async_trait;

use crate::backend::SqlBackend;

/// Concurrency coordinator guarding the insert phase of an append.
#[async_trait]
pub trait WriteLockStrategy<DB: SqlBackend>: Send + Sync {
    /// Acquire the lock for a table. False means a competing appender
    /// holds it and the insert must not be attempted.
    async fn acquire(&self, session: &mut DB::Session, table: &str) -> sqlx::Result<bool>;

    /// Release the lock for a table. Runs on every exit path of the
    /// insert, success or failure.
    async fn release(&self, session: &mut DB::Session, table: &str) -> sqlx::Result<bool>;

    /// Whether the connection should shape the write as a locking read
    /// (`SELECT ... FOR UPDATE`) immediately before the insert instead of
    /// acquiring anything here.
    fn locks_on_write(&self) -> bool {
        false
    }
}

/// Lock key for a stream table.
pub(crate) fn lock_name(table: &str) -> String {
    format!("_{table}_write_lock")
}
