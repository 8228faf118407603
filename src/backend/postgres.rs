//! PostgreSQL backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{DeleteStatement, InsertStatement, PostgresQueryBuilder, SelectStatement};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::SqlBackend;
use crate::classifier::Driver;
use crate::event::EventRow;
use crate::schema::SchemaStatement;

/// PostgreSQL database marker type.
pub struct Postgres;

fn decode_uuid(row: &PgRow, column: &str) -> sqlx::Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn decode_event(row: &PgRow) -> sqlx::Result<EventRow> {
    Ok(EventRow {
        no: row.try_get("no")?,
        event_id: decode_uuid(row, "event_id")?,
        event_type: row.try_get("event_type")?,
        content: row.try_get("content")?,
        headers: row.try_get("headers")?,
        aggregate_id: decode_uuid(row, "aggregate_id")?,
        aggregate_type: row.try_get("aggregate_type")?,
        aggregate_version: row.try_get("aggregate_version")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl SqlBackend for Postgres {
    type Pool = PgPool;
    type Session = sqlx::Transaction<'static, sqlx::Postgres>;

    fn driver() -> Driver {
        Driver::Postgres
    }

    fn build_select(stmt: &SelectStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_insert(stmt: &InsertStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_delete(stmt: &DeleteStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_schema(stmt: &SchemaStatement) -> String {
        match stmt {
            SchemaStatement::CreateTable(s) => s.to_string(PostgresQueryBuilder),
            SchemaStatement::CreateIndex(s) => s.to_string(PostgresQueryBuilder),
            SchemaStatement::DropTable(s) => s.to_string(PostgresQueryBuilder),
        }
    }

    async fn begin(pool: &Self::Pool) -> sqlx::Result<Self::Session> {
        pool.begin().await
    }

    async fn commit(session: Self::Session) -> sqlx::Result<()> {
        session.commit().await
    }

    async fn rollback(session: Self::Session) -> sqlx::Result<()> {
        session.rollback().await
    }

    async fn execute(pool: &Self::Pool, sql: &str) -> sqlx::Result<u64> {
        Ok(sqlx::query(sql).execute(pool).await?.rows_affected())
    }

    async fn execute_in(session: &mut Self::Session, sql: &str) -> sqlx::Result<u64> {
        Ok(sqlx::query(sql)
            .execute(&mut **session)
            .await?
            .rows_affected())
    }

    async fn fetch_rows(pool: &Self::Pool, sql: &str) -> sqlx::Result<Vec<EventRow>> {
        let rows = sqlx::query(sql).fetch_all(pool).await?;
        rows.iter().map(decode_event).collect()
    }

    async fn fetch_names(pool: &Self::Pool, sql: &str) -> sqlx::Result<Vec<String>> {
        let rows = sqlx::query(sql).fetch_all(pool).await?;
        rows.iter().map(|row| row.try_get(0)).collect()
    }

    async fn fetch_scalar(pool: &Self::Pool, sql: &str) -> sqlx::Result<Option<i64>> {
        let row = sqlx::query(sql).fetch_optional(pool).await?;
        row.map(|r| r.try_get(0)).transpose()
    }
}
