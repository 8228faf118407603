//! Index-hinted single-stream layout.

use std::sync::Arc;

use super::single_stream::single_stream_schema;
use super::{StreamLayout, QUERY_AGGREGATE_INDEX};
use crate::error::Result;
use crate::event::{EventConverter, SerializedEvent};
use crate::schema::SchemaStatement;

/// Single-stream layout that additionally forces per-aggregate reads
/// through the query-aggregate index. Only meaningful on MySQL, which is
/// the one supported driver with index hints; the factory rejects it
/// elsewhere.
pub struct IndexedSingleStreamLayout<E> {
    converter: Arc<dyn EventConverter<E>>,
}

impl<E> IndexedSingleStreamLayout<E> {
    pub fn new(converter: Arc<dyn EventConverter<E>>) -> Self {
        Self { converter }
    }
}

impl<E> StreamLayout<E> for IndexedSingleStreamLayout<E> {
    fn create_schema(&self, table: &str) -> Vec<SchemaStatement> {
        single_stream_schema(table)
    }

    fn serialize_event(&self, event: &E) -> Result<SerializedEvent> {
        self.converter.to_row(event, true)
    }

    fn is_auto_incremented(&self) -> bool {
        true
    }

    fn read_index(&self, table: &str) -> Option<String> {
        Some(format!("{table}_{QUERY_AGGREGATE_INDEX}"))
    }
}
