//! MySQL backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{DeleteStatement, InsertStatement, MysqlQueryBuilder, SelectStatement};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use super::SqlBackend;
use crate::classifier::Driver;
use crate::event::EventRow;
use crate::schema::SchemaStatement;

/// MySQL database marker type.
pub struct Mysql;

fn decode_uuid(row: &MySqlRow, column: &str) -> sqlx::Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn decode_event(row: &MySqlRow) -> sqlx::Result<EventRow> {
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
impl SqlBackend for Mysql {
    type Pool = MySqlPool;
    type Session = sqlx::Transaction<'static, sqlx::MySql>;

    fn driver() -> Driver {
        Driver::Mysql
    }

    fn build_select(stmt: &SelectStatement) -> String {
        stmt.to_string(MysqlQueryBuilder)
    }

    fn build_insert(stmt: &InsertStatement) -> String {
        stmt.to_string(MysqlQueryBuilder)
    }

    fn build_delete(stmt: &DeleteStatement) -> String {
        stmt.to_string(MysqlQueryBuilder)
    }

    fn build_schema(stmt: &SchemaStatement) -> String {
        match stmt {
            SchemaStatement::CreateTable(s) => s.to_string(MysqlQueryBuilder),
            SchemaStatement::CreateIndex(s) => s.to_string(MysqlQueryBuilder),
            SchemaStatement::DropTable(s) => s.to_string(MysqlQueryBuilder),
        }
    }

    /// MySQL supports forcing the read index with a `USE INDEX` hint,
    /// spliced in after the table reference since sea-query has no
    /// vocabulary for it.
    fn build_select_hinted(stmt: &SelectStatement, table: &str, index: Option<&str>) -> String {
        let sql = Self::build_select(stmt);

        match index {
            Some(ix) => sql.replacen(
                &format!("FROM `{table}`"),
                &format!("FROM `{table}` USE INDEX ({ix})"),
                1,
            ),
            None => sql,
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
