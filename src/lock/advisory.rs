//! Advisory lock strategy.

use async_trait::async_trait;

use super::{lock_name, WriteLockStrategy};
use crate::backend::SqlBackend;

/// Session-scoped named lock keyed by a hash of the table's lock name.
/// Acquisition blocks at the database until the lock is granted; release
/// must run on the session that acquired. Postgres default.
pub struct AdvisoryWriteLock;

#[async_trait]
impl<DB: SqlBackend> WriteLockStrategy<DB> for AdvisoryWriteLock {
    async fn acquire(&self, session: &mut DB::Session, table: &str) -> sqlx::Result<bool> {
        let sql = format!(
            "SELECT pg_advisory_lock(hashtext('{}'))",
            lock_name(table)
        );
        DB::execute_in(session, &sql).await?;
        Ok(true)
    }

    async fn release(&self, session: &mut DB::Session, table: &str) -> sqlx::Result<bool> {
        let sql = format!(
            "SELECT pg_advisory_unlock(hashtext('{}'))",
            lock_name(table)
        );
        DB::execute_in(session, &sql).await?;
        Ok(true)
    }
}
