//! Test doubles shared by unit tests and the contract test suite.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::SqlBackend;
use crate::error::Result;
use crate::event::{EventConverter, EventRow, SerializedEvent};
use crate::lock::WriteLockStrategy;

/// Minimal domain event double.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SomeEvent {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub aggregate_version: i64,
    pub content: serde_json::Value,
    pub headers: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub fn some_event(version: i64) -> SomeEvent {
    SomeEvent {
        event_id: Uuid::new_v4(),
        aggregate_id: Uuid::new_v4(),
        aggregate_version: version,
        content: serde_json::json!({ "amount": version }),
        headers: serde_json::json!({ "origin": "test" }),
        created_at: Utc::now(),
    }
}

/// A stored row as the mock backend would return it.
pub fn event_row(no: i64) -> EventRow {
    EventRow {
        no,
        event_id: Uuid::new_v4(),
        event_type: "some_event".to_string(),
        content: serde_json::json!({ "amount": no }),
        headers: serde_json::json!({ "origin": "test" }),
        aggregate_id: Uuid::new_v4(),
        aggregate_type: "some_aggregate".to_string(),
        aggregate_version: no,
        created_at: Utc::now(),
    }
}

/// Converter double for `SomeEvent`.
pub struct SomeEventConverter;

impl EventConverter<SomeEvent> for SomeEventConverter {
    fn to_row(&self, event: &SomeEvent, auto_sequence: bool) -> Result<SerializedEvent> {
        Ok(SerializedEvent {
            no: (!auto_sequence).then_some(event.aggregate_version),
            event_id: event.event_id,
            event_type: "some_event".to_string(),
            content: event.content.clone(),
            headers: event.headers.clone(),
            aggregate_id: event.aggregate_id,
            aggregate_type: "some_aggregate".to_string(),
            aggregate_version: event.aggregate_version,
            created_at: event.created_at,
        })
    }

    fn from_row(&self, row: EventRow) -> Result<SomeEvent> {
        Ok(SomeEvent {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            aggregate_version: row.aggregate_version,
            content: row.content,
            headers: row.headers,
            created_at: row.created_at,
        })
    }
}

/// Write-lock spy recording the acquire/release bracket.
pub struct SpyWriteLock {
    grant: AtomicBool,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl SpyWriteLock {
    pub fn new() -> Self {
        Self {
            grant: AtomicBool::new(true),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// A spy that refuses every acquisition.
    pub fn refusing() -> Self {
        let spy = Self::new();
        spy.grant.store(false, Ordering::SeqCst);
        spy
    }

    pub fn acquire_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl Default for SpyWriteLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<DB: SqlBackend> WriteLockStrategy<DB> for SpyWriteLock {
    async fn acquire(&self, _session: &mut DB::Session, _table: &str) -> sqlx::Result<bool> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(self.grant.load(Ordering::SeqCst))
    }

    async fn release(&self, _session: &mut DB::Session, _table: &str) -> sqlx::Result<bool> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}
