//! Transaction capability on the event store connection.
//!
//! One connection type carries the capability; there is no parallel
//! transactional class per driver. While a transaction is open, every
//! write-path statement routes through its session.

use std::future::Future;

use async_trait::async_trait;
use tracing::warn;

use super::EventStore;
use crate::backend::SqlBackend;
use crate::error::{Result, StoreError};

/// Caller-managed transaction control.
///
/// The open-session slot is the source of truth: beginning twice raises
/// `TransactionAlreadyStarted`, committing or rolling back with nothing
/// open raises `TransactionNotStarted`.
#[async_trait]
pub trait TransactionalStore {
    async fn begin_transaction(&self) -> Result<()>;

    async fn commit_transaction(&self) -> Result<()>;

    async fn rollback_transaction(&self) -> Result<()>;

    async fn in_transaction(&self) -> bool;
}

#[async_trait]
impl<E, DB: SqlBackend> TransactionalStore for EventStore<E, DB> {
    async fn begin_transaction(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(StoreError::TransactionAlreadyStarted);
        }

        let tx = DB::begin(&self.pool)
            .await
            .map_err(|e| StoreError::query_failure(&e))?;
        *session = Some(tx);
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let tx = self
            .session
            .lock()
            .await
            .take()
            .ok_or(StoreError::TransactionNotStarted)?;

        DB::commit(tx)
            .await
            .map_err(|e| StoreError::query_failure(&e))
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let tx = self
            .session
            .lock()
            .await
            .take()
            .ok_or(StoreError::TransactionNotStarted)?;

        DB::rollback(tx)
            .await
            .map_err(|e| StoreError::query_failure(&e))
    }

    async fn in_transaction(&self) -> bool {
        self.session.lock().await.is_some()
    }
}

impl<E, DB: SqlBackend> EventStore<E, DB> {
    /// Run `work` inside one transaction: commit on normal return, roll
    /// back and re-raise on any failure from `work`. Returns the work's
    /// value; use `()` when the work has no result of its own.
    pub async fn transactional<'a, F, Fut, T>(&'a self, work: F) -> Result<T>
    where
        F: FnOnce(&'a Self) -> Fut,
        Fut: Future<Output = Result<T>> + 'a,
    {
        self.begin_transaction().await?;

        match work(self).await {
            Ok(value) => {
                self.commit_transaction().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback_transaction().await {
                    warn!(error = %rollback_err, "rollback after failed transactional work also failed");
                }
                Err(e)
            }
        }
    }
}
