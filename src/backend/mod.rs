//! SQL backend abstraction.
//!
//! Backends abstract over the supported drivers by providing the pool and
//! session types, per-driver statement rendering, and statement execution.
//! All orchestration above this trait is driver-independent; everything
//! that differs between drivers (quoting, SQLSTATE vocabulary, index
//! hints) lives in one backend module per driver.

use async_trait::async_trait;
use sea_query::{DeleteStatement, InsertStatement, SelectStatement};

use crate::classifier::Driver;
use crate::event::EventRow;
use crate::schema::SchemaStatement;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(feature = "mysql")]
pub use mysql::Mysql;
#[cfg(feature = "postgres")]
pub use postgres::Postgres;

/// Trait for SQL database backends.
///
/// A session is one dedicated connection holding an open transaction;
/// every statement of an append's lock/insert/release bracket runs on one
/// session so that session-scoped locks cannot land on different
/// connections.
#[async_trait]
pub trait SqlBackend: Send + Sync + 'static {
    /// The connection pool type for this database.
    type Pool: Clone + Send + Sync + 'static;

    /// An open transaction on one dedicated connection.
    type Session: Send + 'static;

    /// The driver family, keying error classification.
    fn driver() -> Driver;

    /// Build a SQL query string from a sea-query SELECT statement.
    fn build_select(stmt: &SelectStatement) -> String;

    /// Build a SQL query string from a sea-query INSERT statement.
    fn build_insert(stmt: &InsertStatement) -> String;

    /// Build a SQL query string from a sea-query DELETE statement.
    fn build_delete(stmt: &DeleteStatement) -> String;

    /// Build a SQL string from a DDL statement.
    fn build_schema(stmt: &SchemaStatement) -> String;

    /// Build a SELECT, forcing the given index where the driver supports
    /// index hints. The default rendering ignores the hint.
    fn build_select_hinted(stmt: &SelectStatement, table: &str, index: Option<&str>) -> String {
        let _ = (table, index);
        Self::build_select(stmt)
    }

    async fn begin(pool: &Self::Pool) -> sqlx::Result<Self::Session>;

    async fn commit(session: Self::Session) -> sqlx::Result<()>;

    async fn rollback(session: Self::Session) -> sqlx::Result<()>;

    /// Execute a statement on the pool, returning the affected row count.
    async fn execute(pool: &Self::Pool, sql: &str) -> sqlx::Result<u64>;

    /// Execute a statement on an open session.
    async fn execute_in(session: &mut Self::Session, sql: &str) -> sqlx::Result<u64>;

    /// Fetch event rows for a read query.
    async fn fetch_rows(pool: &Self::Pool, sql: &str) -> sqlx::Result<Vec<EventRow>>;

    /// Fetch a single string column (catalog name lookups).
    async fn fetch_names(pool: &Self::Pool, sql: &str) -> sqlx::Result<Vec<String>>;

    /// Fetch a single integer scalar (counts), if any row came back.
    async fn fetch_scalar(pool: &Self::Pool, sql: &str) -> sqlx::Result<Option<i64>>;
}
