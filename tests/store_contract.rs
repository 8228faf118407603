//! Contract tests for the event-store connection.
//!
//! Run the full create/append/read/delete lifecycle against the
//! in-memory mock backend and verify the externally observable contract:
//! statement shapes, lock bracketing, classified error surfaces.
//!
//! Requires the `test-utils` feature.

use std::sync::Arc;

use uuid::Uuid;

use annal::backend::mock::{MockBackend, MockPool, MockResponse};
use annal::config::StoreConfig;
use annal::factory::build_store;
use annal::test_utils::{event_row, some_event, SomeEvent, SomeEventConverter};
use annal::{Direction, EventStore, StoreError, Stream, StreamName, TransactionalStore};

fn store(pool: &MockPool, config: &StoreConfig) -> EventStore<SomeEvent, MockBackend> {
    build_store(pool.clone(), Arc::new(SomeEventConverter), config).unwrap()
}

fn named(name: &str, events: Vec<SomeEvent>) -> Stream<SomeEvent> {
    Stream::new(StreamName::new(name), events)
}

#[tokio::test]
async fn test_full_stream_lifecycle() {
    let pool = MockPool::new();
    let store = store(&pool, &StoreConfig::default());
    store.init().await.unwrap();

    let name = StreamName::new("transaction-add");
    assert!(!store.has_stream(&name).await.unwrap());

    store
        .create(&named("transaction-add", vec![some_event(1), some_event(2)]))
        .await
        .unwrap();

    pool.push(MockResponse::Scalar(Some(1)));
    assert!(store.has_stream(&name).await.unwrap());

    pool.push(MockResponse::Rows(vec![event_row(1), event_row(2)]));
    let cursor = store
        .read_all(&name, Uuid::new_v4(), Direction::Asc)
        .await
        .unwrap();
    let events = cursor.collect_events().await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(events[0].aggregate_version < events[1].aggregate_version);

    store.delete_stream(&name).await.unwrap();

    let executed = pool.executed();
    assert!(executed
        .iter()
        .any(|sql| sql.contains("DELETE FROM \"event_streams\"")));
    assert!(executed
        .iter()
        .any(|sql| sql.contains("DROP TABLE \"_transaction-add\"")));
}

#[tokio::test]
async fn test_duplicate_creation_is_already_exists_not_concurrency() {
    let pool = MockPool::new();
    pool.push(MockResponse::Failure("23505".to_string()));

    let store = store(&pool, &StoreConfig::default());
    let err = store
        .create(&named("transaction-add", vec![some_event(1)]))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::StreamAlreadyExists(_)));
}

#[tokio::test]
async fn test_empty_append_is_invisible_to_the_database() {
    let pool = MockPool::new();
    let store = store(&pool, &StoreConfig::default());

    store
        .append(&named("transaction-add", Vec::new()))
        .await
        .unwrap();

    assert!(pool.executed().is_empty());
}

#[tokio::test]
async fn test_append_bracket_stays_on_one_session() {
    let pool = MockPool::new();
    let store = store(&pool, &StoreConfig::default());

    store
        .append(&named("transaction-add", vec![some_event(1)]))
        .await
        .unwrap();

    // Advisory acquire, insert, and release all run between the same
    // BEGIN/COMMIT pair.
    let executed = pool.executed();
    assert_eq!(executed[0], "BEGIN");
    assert!(executed[1].contains("pg_advisory_lock"));
    assert!(executed[2].contains("INSERT INTO \"_transaction-add\""));
    assert!(executed[3].contains("pg_advisory_unlock"));
    assert_eq!(executed[4], "COMMIT");
}

#[tokio::test]
async fn test_delete_of_missing_stream_raises_not_found() {
    let pool = MockPool::new();
    pool.push(MockResponse::Affected(0));

    let store = store(&pool, &StoreConfig::default());
    let err = store
        .delete_stream(&StreamName::new("missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::StreamNotFound(_)));
    // The drop step never ran
    assert_eq!(pool.executed().len(), 1);
}

#[tokio::test]
async fn test_empty_read_raises_not_found_after_consuming() {
    let pool = MockPool::new();
    let store = store(&pool, &StoreConfig::default());

    let mut cursor = store
        .read_all(
            &StreamName::new("transaction-add"),
            Uuid::new_v4(),
            Direction::Asc,
        )
        .await
        .unwrap();

    let first = cursor.next().await.unwrap();
    assert!(matches!(first, Err(StoreError::StreamNotFound(_))));
    assert!(cursor.next().await.is_none());
    assert_eq!(cursor.count(), 0);
}

#[tokio::test]
async fn test_catalog_filters_are_ordered_and_exclude_internal() {
    let pool = MockPool::new();
    let store = store(&pool, &StoreConfig::default());

    pool.push(MockResponse::Names(vec!["a".into(), "b".into(), "c".into()]));
    let filtered = store
        .filter_stream_names(&[
            StreamName::new("b"),
            StreamName::new("a"),
            StreamName::new("c"),
        ])
        .await
        .unwrap();
    assert_eq!(
        filtered,
        vec![StreamName::new("a"), StreamName::new("b"), StreamName::new("c")]
    );

    store.catalog().all_excluding_internal().await.unwrap();
    let executed = pool.executed();
    let internal_sql = executed.last().unwrap();
    assert!(internal_sql.contains("NOT LIKE '$%'"));
    assert!(internal_sql.contains("ORDER BY \"real_stream_name\" ASC"));
}

#[tokio::test]
async fn test_transactional_work_commits_or_rolls_back() {
    let pool = MockPool::new();
    let config = StoreConfig {
        is_transactional: true,
        ..StoreConfig::default()
    };
    let store = store(&pool, &config);

    store
        .transactional(|s| {
            let stream = named("transaction-add", vec![some_event(1)]);
            async move { s.append(&stream).await }
        })
        .await
        .unwrap();

    let executed = pool.executed();
    assert_eq!(executed.iter().filter(|sql| *sql == "BEGIN").count(), 1);
    assert_eq!(executed.last().unwrap(), "COMMIT");

    let err = store
        .transactional(|_s| async { Err::<(), _>(StoreError::Concurrency("lost".to_string())) })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Concurrency(_)));
    assert_eq!(pool.executed().last().unwrap(), "ROLLBACK");
}
