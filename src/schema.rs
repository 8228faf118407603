//! Database schema definitions using sea-query.
//!
//! These define the catalog table, the column identifiers shared by every
//! stream table, and the driver-independent DDL statement wrapper that
//! backends render into SQL.

use sea_query::{
    Alias, ColumnDef, Iden, Index, IndexCreateStatement, Table, TableCreateStatement,
    TableDropStatement,
};

/// Catalog table schema (`event_streams`).
#[derive(Iden)]
pub enum EventStreams {
    #[iden = "event_streams"]
    Table,
    #[iden = "id"]
    Id,
    #[iden = "real_stream_name"]
    RealStreamName,
    #[iden = "stream_name"]
    StreamName,
    #[iden = "category"]
    Category,
}

/// Columns shared by every stream table; the table itself is named
/// dynamically per stream.
#[derive(Iden, Clone, Copy)]
pub enum EventCol {
    #[iden = "no"]
    No,
    #[iden = "event_id"]
    EventId,
    #[iden = "event_type"]
    EventType,
    #[iden = "content"]
    Content,
    #[iden = "headers"]
    Headers,
    #[iden = "aggregate_id"]
    AggregateId,
    #[iden = "aggregate_type"]
    AggregateType,
    #[iden = "aggregate_version"]
    AggregateVersion,
    #[iden = "created_at"]
    CreatedAt,
}

/// A DDL statement awaiting driver-specific rendering.
#[derive(Debug, Clone)]
pub enum SchemaStatement {
    CreateTable(TableCreateStatement),
    CreateIndex(IndexCreateStatement),
    DropTable(TableDropStatement),
}

/// DDL for the catalog table and its category index.
pub fn catalog_schema() -> Vec<SchemaStatement> {
    let mut table = Table::create();
    table
        .table(EventStreams::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(EventStreams::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(EventStreams::RealStreamName)
                .string_len(250)
                .not_null()
                .unique_key(),
        )
        .col(
            ColumnDef::new(EventStreams::StreamName)
                .char_len(150)
                .not_null(),
        )
        .col(ColumnDef::new(EventStreams::Category).string_len(60).null());

    let category_index = Index::create()
        .name("event_streams_category_index")
        .table(EventStreams::Table)
        .col(EventStreams::Category)
        .if_not_exists()
        .to_owned();

    vec![
        SchemaStatement::CreateTable(table.to_owned()),
        SchemaStatement::CreateIndex(category_index),
    ]
}

/// DDL dropping one stream table.
pub fn drop_table(table: &str) -> SchemaStatement {
    SchemaStatement::DropTable(Table::drop().table(Alias::new(table)).to_owned())
}
