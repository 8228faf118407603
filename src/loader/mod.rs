//! Read-path loaders.
//!
//! The event loader turns raw rows into domain events and owns the
//! empty-result contract; the query loader decides how rows are fetched:
//! one materialized result set, or fixed-size pages re-queried on demand.
//! Both produce the same logical event sequence.

mod cursor;

pub use cursor::EventCursor;

use std::collections::VecDeque;
use std::sync::Arc;

use sea_query::SelectStatement;

use crate::backend::SqlBackend;
use crate::classifier::classify;
use crate::error::Result;
use crate::event::EventConverter;
use crate::stream::StreamName;

use cursor::{ChunkedSource, RowSource};

/// Default page size for chunked reads.
pub const DEFAULT_CHUNK_SIZE: u64 = 5000;

/// Converts raw rows into domain events.
pub struct EventLoader<E> {
    converter: Arc<dyn EventConverter<E>>,
}

impl<E> EventLoader<E> {
    pub fn new(converter: Arc<dyn EventConverter<E>>) -> Self {
        Self { converter }
    }

    fn load<DB: SqlBackend>(&self, source: RowSource<DB>, stream: StreamName) -> EventCursor<E, DB> {
        EventCursor::new(source, self.converter.clone(), stream)
    }
}

/// How the read path drives a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLoader {
    /// Execute once and iterate the full result; suits moderate sizes.
    Cursor,
    /// Re-issue the query in `chunk_size` pages, concatenated behind the
    /// same cursor interface; bounds memory on very large streams.
    Chunked { chunk_size: u64 },
}

impl QueryLoader {
    pub fn chunked(chunk_size: u64) -> Self {
        QueryLoader::Chunked { chunk_size }
    }

    pub(crate) async fn query<E, DB: SqlBackend>(
        &self,
        pool: &DB::Pool,
        loader: &EventLoader<E>,
        stmt: SelectStatement,
        table: String,
        index: Option<String>,
        stream: &StreamName,
    ) -> Result<EventCursor<E, DB>> {
        match self {
            QueryLoader::Cursor => {
                let sql = DB::build_select_hinted(&stmt, &table, index.as_deref());
                let rows = DB::fetch_rows(pool, &sql)
                    .await
                    .map_err(|e| classify(DB::driver(), &e, false, stream))?;

                Ok(loader.load(RowSource::Buffered(rows.into()), stream.clone()))
            }
            QueryLoader::Chunked { chunk_size } => Ok(loader.load(
                RowSource::Chunked(ChunkedSource {
                    pool: pool.clone(),
                    query: stmt,
                    table,
                    index,
                    chunk_size: *chunk_size,
                    offset: 0,
                    page: VecDeque::new(),
                    exhausted: false,
                }),
                stream.clone(),
            )),
        }
    }
}

impl Default for QueryLoader {
    fn default() -> Self {
        QueryLoader::Cursor
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use sea_query::{Alias, Order, Query};

    use super::*;
    use crate::backend::mock::{MockBackend, MockPool, MockResponse};
    use crate::error::StoreError;
    use crate::event::EventRow;
    use crate::schema::EventCol;
    use crate::test_utils::{event_row, SomeEvent, SomeEventConverter};

    fn read_query() -> SelectStatement {
        Query::select()
            .columns([EventCol::No, EventCol::EventId])
            .from(Alias::new("_customer"))
            .order_by(EventCol::No, Order::Asc)
            .to_owned()
    }

    async fn run(
        pool: &MockPool,
        strategy: QueryLoader,
    ) -> Result<EventCursor<SomeEvent, MockBackend>> {
        let loader = EventLoader::new(Arc::new(SomeEventConverter));
        strategy
            .query::<SomeEvent, MockBackend>(
                pool,
                &loader,
                read_query(),
                "_customer".to_string(),
                None,
                &StreamName::new("customer"),
            )
            .await
    }

    fn rows(nos: &[i64]) -> Vec<EventRow> {
        nos.iter().map(|no| event_row(*no)).collect()
    }

    #[tokio::test]
    async fn test_cursor_yields_events_in_order() {
        let pool = MockPool::new();
        pool.push(MockResponse::Rows(rows(&[1, 2, 3])));

        let cursor = run(&pool, QueryLoader::Cursor).await.unwrap();
        let events = cursor.collect_events().await.unwrap();

        let versions: Vec<i64> = events.iter().map(|e| e.aggregate_version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_result_raises_not_found_after_exhaustion() {
        let pool = MockPool::new();

        let mut cursor = run(&pool, QueryLoader::Cursor).await.unwrap();
        let first = cursor.next().await.unwrap();
        assert!(matches!(first, Err(StoreError::StreamNotFound(_))));
        assert!(cursor.next().await.is_none());
        assert_eq!(cursor.count(), 0);
    }

    #[tokio::test]
    async fn test_cursor_counts_converted_rows() {
        let pool = MockPool::new();
        pool.push(MockResponse::Rows(rows(&[1, 2])));

        let mut cursor = run(&pool, QueryLoader::Cursor).await.unwrap();
        while cursor.next().await.is_some() {}
        assert_eq!(cursor.count(), 2);
    }

    #[tokio::test]
    async fn test_missing_table_classified_on_initial_fetch() {
        let pool = MockPool::new();
        pool.push(MockResponse::Failure("42P01".to_string()));

        let result = run(&pool, QueryLoader::Cursor).await;
        assert!(matches!(result, Err(StoreError::StreamNotFound(_))));
    }

    #[tokio::test]
    async fn test_chunked_repeats_query_with_offsets() {
        let pool = MockPool::new();
        pool.push(MockResponse::Rows(rows(&[1, 2])));
        pool.push(MockResponse::Rows(rows(&[3])));

        let cursor = run(&pool, QueryLoader::chunked(2)).await.unwrap();
        let events = cursor.collect_events().await.unwrap();

        let versions: Vec<i64> = events.iter().map(|e| e.aggregate_version).collect();
        assert_eq!(versions, vec![1, 2, 3]);

        let executed = pool.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].contains("LIMIT 2 OFFSET 0"));
        assert!(executed[1].contains("LIMIT 2 OFFSET 2"));
    }

    #[tokio::test]
    async fn test_chunked_and_cursor_yield_identical_sequences() {
        for chunk_size in 1u64..=4 {
            let cursor_pool = MockPool::new();
            cursor_pool.push(MockResponse::Rows(rows(&[1, 2, 3])));
            let buffered = run(&cursor_pool, QueryLoader::Cursor)
                .await
                .unwrap()
                .collect_events()
                .await
                .unwrap();

            let chunked_pool = MockPool::new();
            for page in [1i64, 2, 3].chunks(chunk_size as usize) {
                chunked_pool.push(MockResponse::Rows(rows(page)));
            }
            let chunked = run(&chunked_pool, QueryLoader::chunked(chunk_size))
                .await
                .unwrap()
                .collect_events()
                .await
                .unwrap();

            let buffered_nos: Vec<i64> = buffered.iter().map(|e| e.aggregate_version).collect();
            let chunked_nos: Vec<i64> = chunked.iter().map(|e| e.aggregate_version).collect();
            assert_eq!(buffered_nos, chunked_nos, "chunk size {chunk_size}");
        }
    }

    #[tokio::test]
    async fn test_no_rows_code_mid_stream_is_not_found() {
        let pool = MockPool::new();
        pool.push(MockResponse::Rows(rows(&[1, 2])));
        pool.push(MockResponse::Failure("02000".to_string()));

        let mut cursor = run(&pool, QueryLoader::chunked(2)).await.unwrap();
        assert!(cursor.next().await.unwrap().is_ok());
        assert!(cursor.next().await.unwrap().is_ok());

        let third = cursor.next().await.unwrap();
        assert!(matches!(third, Err(StoreError::StreamNotFound(_))));
        assert!(cursor.next().await.is_none());
    }

    #[tokio::test]
    async fn test_other_codes_mid_stream_are_query_failures() {
        let pool = MockPool::new();
        pool.push(MockResponse::Rows(rows(&[1, 2])));
        pool.push(MockResponse::Failure("57014".to_string()));

        let mut cursor = run(&pool, QueryLoader::chunked(2)).await.unwrap();
        assert!(cursor.next().await.unwrap().is_ok());
        assert!(cursor.next().await.unwrap().is_ok());

        let third = cursor.next().await.unwrap();
        assert!(matches!(third, Err(StoreError::QueryFailure { .. })));
    }

    #[tokio::test]
    async fn test_into_stream_adapter() {
        let pool = MockPool::new();
        pool.push(MockResponse::Rows(rows(&[1, 2])));

        let cursor = run(&pool, QueryLoader::Cursor).await.unwrap();
        let events: Vec<_> = cursor
            .into_stream()
            .map(|item| item.unwrap().aggregate_version)
            .collect()
            .await;

        assert_eq!(events, vec![1, 2]);
    }
}
