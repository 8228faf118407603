//! Per-aggregate layout: one table per aggregate instance.

use std::sync::Arc;

use sea_query::{Alias, ColumnDef, Table};

use super::StreamLayout;
use crate::error::Result;
use crate::event::{EventConverter, SerializedEvent};
use crate::schema::{EventCol, SchemaStatement};

/// Layout where the table scopes to one aggregate, so the aggregate
/// version itself is the sequence and the primary key. No secondary
/// index is needed.
pub struct PerAggregateLayout<E> {
    converter: Arc<dyn EventConverter<E>>,
}

impl<E> PerAggregateLayout<E> {
    pub fn new(converter: Arc<dyn EventConverter<E>>) -> Self {
        Self { converter }
    }
}

impl<E> StreamLayout<E> for PerAggregateLayout<E> {
    fn create_schema(&self, table: &str) -> Vec<SchemaStatement> {
        let mut create = Table::create();
        create
            .table(Alias::new(table))
            .col(
                ColumnDef::new(EventCol::No)
                    .big_integer()
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(EventCol::EventId).char_len(36).not_null())
            .col(ColumnDef::new(EventCol::EventType).string().not_null())
            .col(ColumnDef::new(EventCol::Content).json().not_null())
            .col(ColumnDef::new(EventCol::Headers).json_binary().not_null())
            .col(ColumnDef::new(EventCol::AggregateId).char_len(36).not_null())
            .col(ColumnDef::new(EventCol::AggregateType).string().not_null())
            .col(
                ColumnDef::new(EventCol::AggregateVersion)
                    .big_integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(EventCol::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            );

        vec![SchemaStatement::CreateTable(create.to_owned())]
    }

    fn serialize_event(&self, event: &E) -> Result<SerializedEvent> {
        self.converter.to_row(event, false)
    }

    fn is_auto_incremented(&self) -> bool {
        false
    }
}
