//! Stream layout strategies.
//!
//! A layout decides the physical table name and schema for a stream, how
//! a domain event projects onto storable columns, and whether the row
//! sequence is auto-incremented by the database or supplied externally.

mod indexed;
mod per_aggregate;
mod single_stream;

pub use indexed::IndexedSingleStreamLayout;
pub use per_aggregate::PerAggregateLayout;
pub use single_stream::SingleStreamLayout;

use crate::error::Result;
use crate::event::SerializedEvent;
use crate::schema::SchemaStatement;
use crate::stream::StreamName;

/// Name of the per-aggregate replay index on single-stream tables.
pub const QUERY_AGGREGATE_INDEX: &str = "ix_query_aggregate";

/// Physical layout policy for one store.
pub trait StreamLayout<E>: Send + Sync {
    /// Physical table name for a stream; deterministic and pure.
    fn table_name(&self, stream: &StreamName) -> String {
        format!("_{stream}")
    }

    /// DDL for the stream table. No existence pre-check: running it twice
    /// fails on the second run and the caller classifies the error.
    fn create_schema(&self, table: &str) -> Vec<SchemaStatement>;

    /// Project a domain event to its storable columns.
    fn serialize_event(&self, event: &E) -> Result<SerializedEvent>;

    /// Whether the database assigns the `no` sequence itself.
    fn is_auto_incremented(&self) -> bool;

    /// Index the read path should force, if any.
    fn read_index(&self, table: &str) -> Option<String> {
        let _ = table;
        None
    }
}
