//! Stored event shapes and the domain-event conversion seam.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;

/// One event as read back from a stream table.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    /// Position within the stream (`no` column).
    pub no: i64,
    pub event_id: Uuid,
    pub event_type: String,
    pub content: serde_json::Value,
    pub headers: serde_json::Value,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub aggregate_version: i64,
    pub created_at: DateTime<Utc>,
}

/// One event projected to its storable columns.
///
/// `no` is `None` when the target layout auto-increments the sequence;
/// externally sequenced layouts carry the aggregate version here.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedEvent {
    pub no: Option<i64>,
    pub event_id: Uuid,
    pub event_type: String,
    pub content: serde_json::Value,
    pub headers: serde_json::Value,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub aggregate_version: i64,
    pub created_at: DateTime<Utc>,
}

/// Conversion between domain events and their stored row shape.
///
/// Supplied by the application layer; the store never inspects event
/// payloads beyond what this trait exposes. `auto_sequence` tells the
/// converter whether the layout assigns the sequence itself (omit `no`)
/// or expects the aggregate version in it.
pub trait EventConverter<E>: Send + Sync {
    fn to_row(&self, event: &E, auto_sequence: bool) -> Result<SerializedEvent>;

    fn from_row(&self, row: EventRow) -> Result<E>;
}
