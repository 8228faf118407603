//! Single-stream layout: all aggregates of one type share a table.

use std::sync::Arc;

use sea_query::{Alias, ColumnDef, Index, Table};

use super::{StreamLayout, QUERY_AGGREGATE_INDEX};
use crate::error::Result;
use crate::event::{EventConverter, SerializedEvent};
use crate::schema::{EventCol, SchemaStatement};

/// Layout with a database-assigned sequence shared by every aggregate in
/// the table. Per-aggregate replay goes through the secondary
/// `(aggregate_type, aggregate_id, no)` index.
pub struct SingleStreamLayout<E> {
    converter: Arc<dyn EventConverter<E>>,
}

impl<E> SingleStreamLayout<E> {
    pub fn new(converter: Arc<dyn EventConverter<E>>) -> Self {
        Self { converter }
    }
}

/// DDL shared by the plain and index-hinted single-stream layouts.
pub(super) fn single_stream_schema(table: &str) -> Vec<SchemaStatement> {
    let name = Alias::new(table);

    let mut create = Table::create();
    create
        .table(name.clone())
        .col(
            ColumnDef::new(EventCol::No)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(EventCol::EventId)
                .char_len(36)
                .not_null()
                .unique_key(),
        )
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

    let unique_event = Index::create()
        .name(format!("{table}_ix_unique_event"))
        .table(name.clone())
        .col(EventCol::AggregateType)
        .col(EventCol::AggregateId)
        .col(EventCol::AggregateVersion)
        .unique()
        .to_owned();

    let query_aggregate = Index::create()
        .name(format!("{table}_{QUERY_AGGREGATE_INDEX}"))
        .table(name)
        .col(EventCol::AggregateType)
        .col(EventCol::AggregateId)
        .col(EventCol::No)
        .to_owned();

    vec![
        SchemaStatement::CreateTable(create.to_owned()),
        SchemaStatement::CreateIndex(unique_event),
        SchemaStatement::CreateIndex(query_aggregate),
    ]
}

impl<E> StreamLayout<E> for SingleStreamLayout<E> {
    fn create_schema(&self, table: &str) -> Vec<SchemaStatement> {
        single_stream_schema(table)
    }

    fn serialize_event(&self, event: &E) -> Result<SerializedEvent> {
        self.converter.to_row(event, true)
    }

    fn is_auto_incremented(&self) -> bool {
        true
    }
}
