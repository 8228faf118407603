//! Stream catalog over the `event_streams` table.
//!
//! Registry mapping each logical stream name to its physical table and
//! optional category. Deliberately not transactional with stream-table
//! DDL: registration and schema creation are two independently-failing
//! steps with compensation handled by the connection.
//!
//! Errors here are raw driver errors; the connection classifies them
//! before they reach callers.

use sea_query::{Expr, Order, Query};

use crate::backend::SqlBackend;
use crate::schema::{catalog_schema, EventStreams};
use crate::stream::{StreamName, INTERNAL_SIGIL};

pub struct StreamCatalog<DB: SqlBackend> {
    pool: DB::Pool,
}

impl<DB: SqlBackend> Clone for StreamCatalog<DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<DB: SqlBackend> StreamCatalog<DB> {
    pub fn new(pool: DB::Pool) -> Self {
        Self { pool }
    }

    /// Create the catalog table and its category index if missing.
    pub async fn init(&self) -> sqlx::Result<()> {
        for stmt in catalog_schema() {
            DB::execute(&self.pool, &DB::build_schema(&stmt)).await?;
        }
        Ok(())
    }

    /// Register one stream. True iff exactly one row was inserted.
    pub async fn create_entry(
        &self,
        stream_name: &str,
        table_name: &str,
        category: Option<String>,
    ) -> sqlx::Result<bool> {
        let stmt = Query::insert()
            .into_table(EventStreams::Table)
            .columns([
                EventStreams::RealStreamName,
                EventStreams::StreamName,
                EventStreams::Category,
            ])
            .values_panic([stream_name.into(), table_name.into(), category.into()])
            .to_owned();

        let affected = DB::execute(&self.pool, &DB::build_insert(&stmt)).await?;
        Ok(affected == 1)
    }

    /// Remove one stream's entry. True iff exactly one row was removed.
    pub async fn delete_entry(&self, stream_name: &str) -> sqlx::Result<bool> {
        let stmt = Query::delete()
            .from_table(EventStreams::Table)
            .and_where(Expr::col(EventStreams::RealStreamName).eq(stream_name))
            .to_owned();

        let affected = DB::execute(&self.pool, &DB::build_delete(&stmt)).await?;
        Ok(affected == 1)
    }

    pub async fn exists(&self, stream_name: &str) -> sqlx::Result<bool> {
        let stmt = Query::select()
            .expr(Expr::col(EventStreams::Id).count())
            .from(EventStreams::Table)
            .and_where(Expr::col(EventStreams::RealStreamName).eq(stream_name))
            .to_owned();

        let count = DB::fetch_scalar(&self.pool, &DB::build_select(&stmt)).await?;
        Ok(count.unwrap_or(0) > 0)
    }

    /// Registered names among `names`, ascending; unknown names are
    /// silently dropped.
    pub async fn filter_by_streams(&self, names: &[StreamName]) -> sqlx::Result<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let stmt = Query::select()
            .column(EventStreams::RealStreamName)
            .from(EventStreams::Table)
            .and_where(
                Expr::col(EventStreams::RealStreamName)
                    .is_in(names.iter().map(StreamName::as_str)),
            )
            .order_by(EventStreams::RealStreamName, Order::Asc)
            .to_owned();

        DB::fetch_names(&self.pool, &DB::build_select(&stmt)).await
    }

    /// Stream names belonging to any of `categories`, ascending.
    pub async fn filter_by_categories(&self, categories: &[String]) -> sqlx::Result<Vec<String>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let stmt = Query::select()
            .column(EventStreams::RealStreamName)
            .from(EventStreams::Table)
            .and_where(
                Expr::col(EventStreams::Category).is_in(categories.iter().map(String::as_str)),
            )
            .order_by(EventStreams::RealStreamName, Order::Asc)
            .to_owned();

        DB::fetch_names(&self.pool, &DB::build_select(&stmt)).await
    }

    /// Every registered stream except `$`-prefixed internal ones,
    /// ascending.
    pub async fn all_excluding_internal(&self) -> sqlx::Result<Vec<String>> {
        let stmt = Query::select()
            .column(EventStreams::RealStreamName)
            .from(EventStreams::Table)
            .and_where(
                Expr::col(EventStreams::RealStreamName).not_like(format!("{INTERNAL_SIGIL}%")),
            )
            .order_by(EventStreams::RealStreamName, Order::Asc)
            .to_owned();

        DB::fetch_names(&self.pool, &DB::build_select(&stmt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockBackend, MockPool, MockResponse};

    fn catalog(pool: &MockPool) -> StreamCatalog<MockBackend> {
        StreamCatalog::new(pool.clone())
    }

    #[tokio::test]
    async fn test_init_creates_table_and_index() {
        let pool = MockPool::new();
        catalog(&pool).init().await.unwrap();

        let executed = pool.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].contains("CREATE TABLE IF NOT EXISTS \"event_streams\""));
        assert!(executed[1].contains("event_streams_category_index"));
    }

    #[tokio::test]
    async fn test_create_entry_inserts_one_row() {
        let pool = MockPool::new();
        let created = catalog(&pool)
            .create_entry("transaction-add", "_transaction-add", Some("transaction".into()))
            .await
            .unwrap();

        assert!(created);
        let executed = pool.executed();
        assert!(executed[0].contains("INSERT INTO \"event_streams\""));
        assert!(executed[0].contains("'transaction-add'"));
        assert!(executed[0].contains("'transaction'"));
    }

    #[tokio::test]
    async fn test_create_entry_without_category_inserts_null() {
        let pool = MockPool::new();
        catalog(&pool)
            .create_entry("customer", "_customer", None)
            .await
            .unwrap();

        assert!(pool.executed()[0].contains("NULL"));
    }

    #[tokio::test]
    async fn test_delete_entry_reports_missing_row() {
        let pool = MockPool::new();
        pool.push(MockResponse::Affected(0));

        let deleted = catalog(&pool).delete_entry("customer").await.unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_filter_by_streams_orders_ascending() {
        let pool = MockPool::new();
        pool.push(MockResponse::Names(vec!["a".into(), "b".into(), "c".into()]));

        let names = [
            StreamName::new("b"),
            StreamName::new("a"),
            StreamName::new("c"),
        ];
        let result = catalog(&pool).filter_by_streams(&names).await.unwrap();

        assert_eq!(result, vec!["a", "b", "c"]);
        let sql = &pool.executed()[0];
        assert!(sql.contains("IN ('b', 'a', 'c')"));
        assert!(sql.contains("ORDER BY \"real_stream_name\" ASC"));
    }

    #[tokio::test]
    async fn test_filter_by_streams_short_circuits_on_empty_input() {
        let pool = MockPool::new();
        let result = catalog(&pool).filter_by_streams(&[]).await.unwrap();

        assert!(result.is_empty());
        assert!(pool.executed().is_empty());
    }

    #[tokio::test]
    async fn test_filter_by_categories_orders_ascending() {
        let pool = MockPool::new();
        catalog(&pool)
            .filter_by_categories(&["transaction".to_string()])
            .await
            .unwrap();

        let sql = &pool.executed()[0];
        assert!(sql.contains("\"category\" IN ('transaction')"));
        assert!(sql.contains("ORDER BY \"real_stream_name\" ASC"));
    }

    #[tokio::test]
    async fn test_all_excluding_internal_filters_sigil() {
        let pool = MockPool::new();
        catalog(&pool).all_excluding_internal().await.unwrap();

        let sql = &pool.executed()[0];
        assert!(sql.contains("NOT LIKE '$%'"));
        assert!(sql.contains("ORDER BY \"real_stream_name\" ASC"));
    }

    #[tokio::test]
    async fn test_exists_counts_matching_rows() {
        let pool = MockPool::new();
        pool.push(MockResponse::Scalar(Some(1)));
        assert!(catalog(&pool).exists("customer").await.unwrap());

        pool.push(MockResponse::Scalar(Some(0)));
        assert!(!catalog(&pool).exists("missing").await.unwrap());

        // No row at all counts as absent
        assert!(!catalog(&pool).exists("missing").await.unwrap());
    }
}
