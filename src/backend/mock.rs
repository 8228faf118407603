//! In-memory mock backend for testing.
//!
//! Records every statement it is asked to run and replays scripted
//! responses, so orchestration logic can be exercised without a live
//! database. Renders statements with the Postgres builder and classifies
//! as the Postgres driver.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_query::{DeleteStatement, InsertStatement, PostgresQueryBuilder, SelectStatement};

use super::SqlBackend;
use crate::classifier::Driver;
use crate::event::EventRow;
use crate::schema::SchemaStatement;

/// A database error double with a scriptable SQLSTATE.
#[derive(Debug)]
pub struct FakeDbError {
    code: Option<String>,
    message: String,
}

impl FakeDbError {
    pub fn with_code(code: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            message: format!("database error {code}"),
        }
    }

    pub fn new(message: &str) -> Self {
        Self {
            code: None,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FakeDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for FakeDbError {}

impl sqlx::error::DatabaseError for FakeDbError {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        self.code.as_deref().map(Cow::Borrowed)
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        match self.code.as_deref() {
            Some("23000") | Some("23505") => sqlx::error::ErrorKind::UniqueViolation,
            _ => sqlx::error::ErrorKind::Other,
        }
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }
}

/// One scripted response, consumed by the next call of the matching kind.
pub enum MockResponse {
    Affected(u64),
    Rows(Vec<EventRow>),
    Names(Vec<String>),
    Scalar(Option<i64>),
    Failure(String),
}

#[derive(Default)]
struct MockState {
    log: Mutex<Vec<String>>,
    responses: Mutex<VecDeque<MockResponse>>,
}

/// Shared handle standing in for a connection pool.
#[derive(Clone, Default)]
pub struct MockPool {
    state: Arc<MockState>,
}

impl MockPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next call of the matching kind.
    pub fn push(&self, response: MockResponse) {
        self.state.responses.lock().unwrap().push_back(response);
    }

    /// Snapshot of every statement run so far, in order. Transaction
    /// boundaries appear as `BEGIN` / `COMMIT` / `ROLLBACK`.
    pub fn executed(&self) -> Vec<String> {
        self.state.log.lock().unwrap().clone()
    }

    fn record(&self, sql: &str) {
        self.state.log.lock().unwrap().push(sql.to_string());
    }

    fn pop_if(&self, matching: fn(&MockResponse) -> bool) -> Option<MockResponse> {
        let mut responses = self.state.responses.lock().unwrap();
        if responses.front().is_some_and(matching) {
            responses.pop_front()
        } else {
            None
        }
    }

    fn run_execute(&self, sql: &str) -> sqlx::Result<u64> {
        self.record(sql);
        match self.pop_if(|r| matches!(r, MockResponse::Affected(_) | MockResponse::Failure(_))) {
            Some(MockResponse::Affected(n)) => Ok(n),
            Some(MockResponse::Failure(code)) => Err(failure(&code)),
            _ => Ok(1),
        }
    }
}

fn failure(code: &str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(FakeDbError::with_code(code)))
}

/// Open transaction double; routes back into the owning pool's log.
pub struct MockSession {
    pool: MockPool,
}

/// Mock database marker type.
pub struct MockBackend;

#[async_trait]
impl SqlBackend for MockBackend {
    type Pool = MockPool;
    type Session = MockSession;

    fn driver() -> Driver {
        Driver::Postgres
    }

    fn build_select(stmt: &SelectStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_insert(stmt: &InsertStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_delete(stmt: &DeleteStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_schema(stmt: &SchemaStatement) -> String {
        match stmt {
            SchemaStatement::CreateTable(s) => s.to_string(PostgresQueryBuilder),
            SchemaStatement::CreateIndex(s) => s.to_string(PostgresQueryBuilder),
            SchemaStatement::DropTable(s) => s.to_string(PostgresQueryBuilder),
        }
    }

    async fn begin(pool: &Self::Pool) -> sqlx::Result<Self::Session> {
        pool.record("BEGIN");
        Ok(MockSession { pool: pool.clone() })
    }

    async fn commit(session: Self::Session) -> sqlx::Result<()> {
        session.pool.record("COMMIT");
        Ok(())
    }

    async fn rollback(session: Self::Session) -> sqlx::Result<()> {
        session.pool.record("ROLLBACK");
        Ok(())
    }

    async fn execute(pool: &Self::Pool, sql: &str) -> sqlx::Result<u64> {
        pool.run_execute(sql)
    }

    async fn execute_in(session: &mut Self::Session, sql: &str) -> sqlx::Result<u64> {
        session.pool.run_execute(sql)
    }

    async fn fetch_rows(pool: &Self::Pool, sql: &str) -> sqlx::Result<Vec<EventRow>> {
        pool.record(sql);
        match pool.pop_if(|r| matches!(r, MockResponse::Rows(_) | MockResponse::Failure(_))) {
            Some(MockResponse::Rows(rows)) => Ok(rows),
            Some(MockResponse::Failure(code)) => Err(failure(&code)),
            _ => Ok(Vec::new()),
        }
    }

    async fn fetch_names(pool: &Self::Pool, sql: &str) -> sqlx::Result<Vec<String>> {
        pool.record(sql);
        match pool.pop_if(|r| matches!(r, MockResponse::Names(_) | MockResponse::Failure(_))) {
            Some(MockResponse::Names(names)) => Ok(names),
            Some(MockResponse::Failure(code)) => Err(failure(&code)),
            _ => Ok(Vec::new()),
        }
    }

    async fn fetch_scalar(pool: &Self::Pool, sql: &str) -> sqlx::Result<Option<i64>> {
        pool.record(sql);
        match pool.pop_if(|r| matches!(r, MockResponse::Scalar(_) | MockResponse::Failure(_))) {
            Some(MockResponse::Scalar(value)) => Ok(value),
            Some(MockResponse::Failure(code)) => Err(failure(&code)),
            _ => Ok(None),
        }
    }
}
