//! Structural row-lock strategy.

use async_trait::async_trait;

use super::WriteLockStrategy;
use crate::backend::SqlBackend;

/// Not a lock strategy per se: acquire and release are no-ops, but the
/// connection is instructed to run a locking read on the target table
/// immediately before the insert, so concurrent appenders serialize on
/// the table's lock. This mitigates sequence gaps in auto-incremented
/// tables under concurrent appends. MySQL default.
pub struct RowWriteLock;

#[async_trait]
impl<DB: SqlBackend> WriteLockStrategy<DB> for RowWriteLock {
    async fn acquire(&self, _session: &mut DB::Session, _table: &str) -> sqlx::Result<bool> {
        Ok(true)
    }

    async fn release(&self, _session: &mut DB::Session, _table: &str) -> sqlx::Result<bool> {
        Ok(true)
    }

    fn locks_on_write(&self) -> bool {
        true
    }
}
