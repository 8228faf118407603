//! Event store connection.
//!
//! Orchestrates the catalog, layout strategy, write lock, and loaders to
//! implement create/append/read/delete over one SQL driver. Every raw
//! driver error is classified at this boundary before reaching callers.

mod transaction;

pub use transaction::TransactionalStore;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sea_query::{Alias, Expr, InsertStatement, LockType, Order, Query, SelectStatement};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::SqlBackend;
use crate::catalog::StreamCatalog;
use crate::classifier::{classify, is_benign};
use crate::error::{Result, StoreError};
use crate::event::{EventConverter, SerializedEvent};
use crate::layout::StreamLayout;
use crate::loader::{EventCursor, EventLoader, QueryLoader};
use crate::lock::WriteLockStrategy;
use crate::schema::{drop_table, EventCol};
use crate::stream::{CategoryDetector, Stream, StreamName};

/// Read ordering over the sequence column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        }
    }
}

/// Opaque filter applied to a read query before execution. The filter
/// vocabulary belongs to the caller; the store only applies it.
pub trait QueryFilter: Send + Sync {
    fn apply(&self, query: &mut SelectStatement);
}

impl<F> QueryFilter for F
where
    F: Fn(&mut SelectStatement) + Send + Sync,
{
    fn apply(&self, query: &mut SelectStatement) {
        self(query)
    }
}

/// Resets the creation flag on every exit path.
struct CreationGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CreationGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Event store over one SQL driver.
pub struct EventStore<E, DB: SqlBackend> {
    pool: DB::Pool,
    catalog: StreamCatalog<DB>,
    layout: Arc<dyn StreamLayout<E>>,
    event_loader: EventLoader<E>,
    query_loader: QueryLoader,
    write_lock: Arc<dyn WriteLockStrategy<DB>>,
    categories: CategoryDetector,
    during_creation: AtomicBool,
    session: Mutex<Option<DB::Session>>,
    supports_transaction: bool,
}

impl<E, DB: SqlBackend> EventStore<E, DB> {
    pub fn new(
        pool: DB::Pool,
        converter: Arc<dyn EventConverter<E>>,
        layout: Arc<dyn StreamLayout<E>>,
        write_lock: Arc<dyn WriteLockStrategy<DB>>,
        query_loader: QueryLoader,
        categories: CategoryDetector,
    ) -> Self {
        Self {
            catalog: StreamCatalog::new(pool.clone()),
            event_loader: EventLoader::new(converter),
            pool,
            layout,
            query_loader,
            write_lock,
            categories,
            during_creation: AtomicBool::new(false),
            session: Mutex::new(None),
            supports_transaction: false,
        }
    }

    /// Mark this store as participating in caller-managed transactions.
    pub fn with_transaction_support(mut self) -> Self {
        self.supports_transaction = true;
        self
    }

    /// Whether the transactional extension is wired for this store.
    pub fn supports_transaction(&self) -> bool {
        self.supports_transaction
    }

    /// Whether a `create` is in flight; disambiguates otherwise-identical
    /// driver codes during classification.
    pub fn is_during_creation(&self) -> bool {
        self.during_creation.load(Ordering::SeqCst)
    }

    /// The stream catalog backing this store.
    pub fn catalog(&self) -> &StreamCatalog<DB> {
        &self.catalog
    }

    /// Create the catalog table if missing.
    pub async fn init(&self) -> Result<()> {
        self.catalog
            .init()
            .await
            .map_err(|e| StoreError::query_failure(&e))?;
        debug!("event stream catalog ready");
        Ok(())
    }

    /// First commit of a stream: register it in the catalog, create its
    /// physical table, then append its initial events.
    ///
    /// Registration and DDL are two independently-failing steps, not one
    /// transaction; a DDL failure triggers best-effort compensation
    /// (drop the table, delete the entry). A crash between the steps can
    /// leave an orphan catalog entry, which surfaces as
    /// `StreamAlreadyExists` on retry and needs operator cleanup.
    pub async fn create(&self, stream: &Stream<E>) -> Result<()> {
        let name = stream.name();
        let table = self.layout.table_name(name);

        {
            let _creating = CreationGuard::enter(&self.during_creation);

            self.register_stream(name, &table).await?;
            self.up_stream_table(name, &table).await?;
        }

        self.append(stream).await
    }

    /// Append a stream's pending events.
    ///
    /// Zero pending events is a no-op: no lock, no query. Otherwise the
    /// write-lock bracket covers exactly the insert, on one session, with
    /// release on every exit path.
    pub async fn append(&self, stream: &Stream<E>) -> Result<()> {
        let name = stream.name();

        let rows = self.serialize_events(stream)?;
        if rows.is_empty() {
            return Ok(());
        }

        let table = self.layout.table_name(name);
        let insert_sql = DB::build_insert(&self.insert_statement(&table, &rows)?);

        let mut session = self.session.lock().await;
        match session.as_mut() {
            Some(tx) => self.locked_insert(tx, name, &table, &insert_sql).await?,
            None => {
                drop(session);

                let mut tx = DB::begin(&self.pool)
                    .await
                    .map_err(|e| self.classify_err(&e, name))?;

                match self.locked_insert(&mut tx, name, &table, &insert_sql).await {
                    Ok(()) => DB::commit(tx)
                        .await
                        .map_err(|e| self.classify_err(&e, name))?,
                    Err(e) => {
                        if let Err(rollback_err) = DB::rollback(tx).await {
                            warn!(stream = %name, error = %rollback_err, "rollback after failed append also failed");
                        }
                        return Err(e);
                    }
                }
            }
        }

        debug!(stream = %name, table = %table, events = rows.len(), "events appended");
        Ok(())
    }

    /// Read a stream's events ordered by sequence.
    ///
    /// Auto-incremented layouts share the table across aggregates, so the
    /// read filters by `aggregate_id`; per-aggregate tables already scope
    /// to one aggregate.
    pub async fn read_all(
        &self,
        stream_name: &StreamName,
        aggregate_id: Uuid,
        direction: Direction,
    ) -> Result<EventCursor<E, DB>> {
        let mut stmt = self.read_statement(stream_name);

        if self.layout.is_auto_incremented() {
            stmt.and_where(Expr::col(EventCol::AggregateId).eq(aggregate_id.to_string()));
        }
        stmt.order_by(EventCol::No, direction.into());

        self.load(stmt, stream_name).await
    }

    /// Read with a caller-supplied filter applied to the query.
    pub async fn read_filtered(
        &self,
        stream_name: &StreamName,
        filter: &dyn QueryFilter,
    ) -> Result<EventCursor<E, DB>> {
        let mut stmt = self.read_statement(stream_name);
        filter.apply(&mut stmt);

        self.load(stmt, stream_name).await
    }

    /// Delete a stream: its catalog entry, then its table. Two
    /// independent best-effort steps, each tolerating the driver's benign
    /// "no error" code.
    pub async fn delete_stream(&self, stream_name: &StreamName) -> Result<()> {
        match self.catalog.delete_entry(stream_name.as_str()).await {
            Ok(true) => {}
            Ok(false) => return Err(StoreError::StreamNotFound(stream_name.to_string())),
            Err(e) if is_benign(&e) => {}
            Err(e) => return Err(StoreError::query_failure(&e)),
        }

        let table = self.layout.table_name(stream_name);
        match self.run(&DB::build_schema(&drop_table(&table))).await {
            Ok(_) => {}
            Err(e) if is_benign(&e) => {}
            Err(e) => return Err(StoreError::query_failure(&e)),
        }

        debug!(stream = %stream_name, table = %table, "stream deleted");
        Ok(())
    }

    /// Registered names among `names`, ascending.
    pub async fn filter_stream_names(&self, names: &[StreamName]) -> Result<Vec<StreamName>> {
        let found = self
            .catalog
            .filter_by_streams(names)
            .await
            .map_err(|e| StoreError::query_failure(&e))?;

        Ok(found.into_iter().map(StreamName::new).collect())
    }

    /// Stream names in any of `categories`, ascending.
    pub async fn filter_category_names(&self, categories: &[String]) -> Result<Vec<String>> {
        self.catalog
            .filter_by_categories(categories)
            .await
            .map_err(|e| StoreError::query_failure(&e))
    }

    pub async fn has_stream(&self, stream_name: &StreamName) -> Result<bool> {
        self.catalog
            .exists(stream_name.as_str())
            .await
            .map_err(|e| StoreError::query_failure(&e))
    }

    fn classify_err(&self, err: &sqlx::Error, stream: &StreamName) -> StoreError {
        classify(DB::driver(), err, self.is_during_creation(), stream)
    }

    /// Execute a statement, routed through the open session if any.
    async fn run(&self, sql: &str) -> sqlx::Result<u64> {
        let mut session = self.session.lock().await;
        match session.as_mut() {
            Some(tx) => DB::execute_in(tx, sql).await,
            None => DB::execute(&self.pool, sql).await,
        }
    }

    async fn register_stream(&self, name: &StreamName, table: &str) -> Result<()> {
        let category = self.categories.detect(name.as_str());

        let created = self
            .catalog
            .create_entry(name.as_str(), table, category)
            .await
            .map_err(|e| self.classify_err(&e, name))?;

        if !created {
            return Err(StoreError::QueryFailure {
                code: None,
                message: format!("unable to register stream {name} in the catalog"),
            });
        }

        debug!(stream = %name, table, "stream registered");
        Ok(())
    }

    async fn up_stream_table(&self, name: &StreamName, table: &str) -> Result<()> {
        for stmt in self.layout.create_schema(table) {
            if let Err(e) = self.run(&DB::build_schema(&stmt)).await {
                warn!(stream = %name, table, error = %e, "schema creation failed, compensating");
                self.tear_down(name, table).await?;
                return Err(self.classify_err(&e, name));
            }
        }
        Ok(())
    }

    /// Best-effort removal of the partially created table and catalog
    /// entry. Benign driver codes are swallowed; anything else re-raises.
    async fn tear_down(&self, name: &StreamName, table: &str) -> Result<()> {
        if let Err(e) = self.run(&DB::build_schema(&drop_table(table))).await {
            if !is_benign(&e) {
                return Err(StoreError::query_failure(&e));
            }
        }

        if let Err(e) = self.catalog.delete_entry(name.as_str()).await {
            if !is_benign(&e) {
                return Err(StoreError::query_failure(&e));
            }
        }

        Ok(())
    }

    async fn locked_insert(
        &self,
        session: &mut DB::Session,
        name: &StreamName,
        table: &str,
        insert_sql: &str,
    ) -> Result<()> {
        let acquired = self
            .write_lock
            .acquire(session, table)
            .await
            .map_err(|e| self.classify_err(&e, name))?;

        if !acquired {
            return Err(StoreError::Concurrency(format!(
                "failed to acquire write lock on {table}"
            )));
        }

        let result = self.insert_events(session, name, table, insert_sql).await;

        // Release runs regardless of the insert outcome
        let released = self.write_lock.release(session, table).await;

        match (result, released) {
            (Err(e), _) => Err(e),
            (Ok(()), Err(e)) => Err(self.classify_err(&e, name)),
            (Ok(()), Ok(_)) => Ok(()),
        }
    }

    async fn insert_events(
        &self,
        session: &mut DB::Session,
        name: &StreamName,
        table: &str,
        insert_sql: &str,
    ) -> Result<()> {
        if self.write_lock.locks_on_write() {
            let locking_read = Query::select()
                .expr(Expr::col(EventCol::No).max())
                .from(Alias::new(table))
                .lock(LockType::Update)
                .to_owned();

            DB::execute_in(session, &DB::build_select(&locking_read))
                .await
                .map_err(|e| self.classify_err(&e, name))?;
        }

        DB::execute_in(session, insert_sql)
            .await
            .map_err(|e| self.classify_err(&e, name))?;

        Ok(())
    }

    fn serialize_events(&self, stream: &Stream<E>) -> Result<Vec<SerializedEvent>> {
        stream
            .events()
            .iter()
            .map(|event| self.layout.serialize_event(event))
            .collect()
    }

    fn insert_statement(&self, table: &str, rows: &[SerializedEvent]) -> Result<InsertStatement> {
        let auto = self.layout.is_auto_incremented();

        let mut columns = vec![
            EventCol::EventId,
            EventCol::EventType,
            EventCol::Content,
            EventCol::Headers,
            EventCol::AggregateId,
            EventCol::AggregateType,
            EventCol::AggregateVersion,
            EventCol::CreatedAt,
        ];
        if !auto {
            columns.insert(0, EventCol::No);
        }

        let mut stmt = Query::insert();
        stmt.into_table(Alias::new(table)).columns(columns);

        for row in rows {
            let mut values: Vec<sea_query::SimpleExpr> = Vec::with_capacity(9);
            if !auto {
                let no = row.no.ok_or_else(|| {
                    StoreError::Conversion(
                        "externally sequenced layout requires a sequence on every event"
                            .to_string(),
                    )
                })?;
                values.push(no.into());
            }
            values.push(row.event_id.to_string().into());
            values.push(row.event_type.clone().into());
            values.push(row.content.clone().into());
            values.push(row.headers.clone().into());
            values.push(row.aggregate_id.to_string().into());
            values.push(row.aggregate_type.clone().into());
            values.push(row.aggregate_version.into());
            values.push(row.created_at.into());

            stmt.values_panic(values);
        }

        Ok(stmt)
    }

    fn read_statement(&self, stream_name: &StreamName) -> SelectStatement {
        let table = self.layout.table_name(stream_name);

        Query::select()
            .columns([
                EventCol::No,
                EventCol::EventId,
                EventCol::EventType,
                EventCol::Content,
                EventCol::Headers,
                EventCol::AggregateId,
                EventCol::AggregateType,
                EventCol::AggregateVersion,
                EventCol::CreatedAt,
            ])
            .from(Alias::new(&table))
            .to_owned()
    }

    async fn load(
        &self,
        stmt: SelectStatement,
        stream_name: &StreamName,
    ) -> Result<EventCursor<E, DB>> {
        let table = self.layout.table_name(stream_name);
        let index = self.layout.read_index(&table);

        self.query_loader
            .query::<E, DB>(
                &self.pool,
                &self.event_loader,
                stmt,
                table,
                index,
                stream_name,
            )
            .await
    }
}
