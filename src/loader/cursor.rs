//! Pull-based event cursor.

use std::collections::VecDeque;
use std::sync::Arc;

use sea_query::SelectStatement;

use crate::backend::SqlBackend;
use crate::classifier::classify_read;
use crate::error::{Result, StoreError};
use crate::event::{EventConverter, EventRow};
use crate::stream::StreamName;

/// Lazy, finite, non-restartable sequence of domain events.
///
/// Rows are converted one at a time on `next()`. Once the underlying rows
/// are exhausted having produced zero events, the cursor yields
/// `StreamNotFound` exactly once and terminates; database errors surfaced
/// mid-stream are reclassified before they reach the caller.
pub struct EventCursor<E, DB: SqlBackend> {
    source: RowSource<DB>,
    converter: Arc<dyn EventConverter<E>>,
    stream: StreamName,
    converted: u64,
    done: bool,
}

/// Where the cursor pulls raw rows from.
pub(super) enum RowSource<DB: SqlBackend> {
    /// Fully materialized result set.
    Buffered(VecDeque<EventRow>),
    /// Paginated re-querying, bounding memory on large streams.
    Chunked(ChunkedSource<DB>),
}

pub(super) struct ChunkedSource<DB: SqlBackend> {
    pub(super) pool: DB::Pool,
    pub(super) query: SelectStatement,
    pub(super) table: String,
    pub(super) index: Option<String>,
    pub(super) chunk_size: u64,
    pub(super) offset: u64,
    pub(super) page: VecDeque<EventRow>,
    pub(super) exhausted: bool,
}

impl<DB: SqlBackend> ChunkedSource<DB> {
    async fn pull(&mut self) -> sqlx::Result<Option<EventRow>> {
        if self.page.is_empty() && !self.exhausted {
            let mut stmt = self.query.clone();
            stmt.limit(self.chunk_size).offset(self.offset);

            let sql = DB::build_select_hinted(&stmt, &self.table, self.index.as_deref());
            let rows = DB::fetch_rows(&self.pool, &sql).await?;

            if (rows.len() as u64) < self.chunk_size {
                self.exhausted = true;
            }
            self.offset += rows.len() as u64;
            self.page = rows.into();
        }

        Ok(self.page.pop_front())
    }
}

impl<E, DB: SqlBackend> EventCursor<E, DB> {
    pub(super) fn new(
        source: RowSource<DB>,
        converter: Arc<dyn EventConverter<E>>,
        stream: StreamName,
    ) -> Self {
        Self {
            source,
            converter,
            stream,
            converted: 0,
            done: false,
        }
    }

    /// Pull the next event. `None` marks the end of the sequence; the
    /// cursor never yields again after that or after an error.
    pub async fn next(&mut self) -> Option<Result<E>> {
        if self.done {
            return None;
        }

        let row = match self.pull().await {
            Ok(row) => row,
            Err(e) => {
                self.done = true;
                return Some(Err(classify_read(DB::driver(), &e, &self.stream)));
            }
        };

        match row {
            Some(row) => match self.converter.from_row(row) {
                Ok(event) => {
                    self.converted += 1;
                    Some(Ok(event))
                }
                Err(e) => {
                    self.done = true;
                    Some(Err(e))
                }
            },
            None => {
                self.done = true;
                if self.converted == 0 {
                    Some(Err(StoreError::StreamNotFound(self.stream.to_string())))
                } else {
                    None
                }
            }
        }
    }

    /// Count of successfully converted rows so far; the sequence's
    /// terminal value once `next()` returned `None`.
    pub fn count(&self) -> u64 {
        self.converted
    }

    /// Drain the cursor into a vector, stopping at the first error.
    pub async fn collect_events(mut self) -> Result<Vec<E>> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event?);
        }
        Ok(events)
    }

    /// Adapt the cursor to a `futures::Stream`.
    pub fn into_stream(self) -> impl futures::Stream<Item = Result<E>> {
        futures::stream::unfold(self, |mut cursor| async move {
            cursor.next().await.map(|item| (item, cursor))
        })
    }

    async fn pull(&mut self) -> sqlx::Result<Option<EventRow>> {
        match &mut self.source {
            RowSource::Buffered(rows) => Ok(rows.pop_front()),
            RowSource::Chunked(chunked) => chunked.pull().await,
        }
    }
}
