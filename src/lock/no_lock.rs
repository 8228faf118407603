//! No-op lock strategy.

use async_trait::async_trait;

use super::WriteLockStrategy;
use crate::backend::SqlBackend;

/// No locking at all; appends rely solely on the table's unique
/// constraints. Default when locking is configured off.
pub struct NoWriteLock;

#[async_trait]
impl<DB: SqlBackend> WriteLockStrategy<DB> for NoWriteLock {
    async fn acquire(&self, _session: &mut DB::Session, _table: &str) -> sqlx::Result<bool> {
        Ok(true)
    }

    async fn release(&self, _session: &mut DB::Session, _table: &str) -> sqlx::Result<bool> {
        Ok(true)
    }
}
