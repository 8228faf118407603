//! Store construction from typed configuration.
//!
//! An explicit factory: the configuration struct decides which layout,
//! loader, and lock strategies get wired, with no runtime string-to-type
//! lookup. Custom strategies bypass the factory and go straight through
//! `EventStore::new`.

use std::sync::Arc;

use crate::backend::SqlBackend;
use crate::classifier::Driver;
use crate::config::{ConfigError, PersistenceStrategy, StoreConfig};
use crate::event::EventConverter;
use crate::layout::{
    IndexedSingleStreamLayout, PerAggregateLayout, SingleStreamLayout, StreamLayout,
};
use crate::lock::{AdvisoryWriteLock, NoWriteLock, RowWriteLock, WriteLockStrategy};
use crate::store::EventStore;
use crate::stream::CategoryDetector;

/// Build a fully wired event store for the given driver.
pub fn build_store<E, DB>(
    pool: DB::Pool,
    converter: Arc<dyn EventConverter<E>>,
    config: &StoreConfig,
) -> Result<EventStore<E, DB>, ConfigError>
where
    E: 'static,
    DB: SqlBackend,
{
    let layout: Arc<dyn StreamLayout<E>> = match config.persistence_strategy {
        PersistenceStrategy::Single => Arc::new(SingleStreamLayout::new(converter.clone())),
        PersistenceStrategy::PerAggregate => Arc::new(PerAggregateLayout::new(converter.clone())),
        PersistenceStrategy::SingleIndexed => {
            if DB::driver() != Driver::Mysql {
                return Err(ConfigError::IndexedRequiresMysql);
            }
            Arc::new(IndexedSingleStreamLayout::new(converter.clone()))
        }
    };

    let write_lock: Arc<dyn WriteLockStrategy<DB>> = if config.write_lock {
        default_write_lock::<DB>()
    } else {
        Arc::new(NoWriteLock)
    };

    let store = EventStore::new(
        pool,
        converter,
        layout,
        write_lock,
        config.query_loader.to_loader(),
        CategoryDetector::new(config.category_separator),
    );

    Ok(if config.is_transactional {
        store.with_transaction_support()
    } else {
        store
    })
}

/// Driver-default locking: structural row locks on MySQL, advisory locks
/// on Postgres.
fn default_write_lock<DB: SqlBackend>() -> Arc<dyn WriteLockStrategy<DB>> {
    match DB::driver() {
        Driver::Mysql => Arc::new(RowWriteLock),
        Driver::Postgres => Arc::new(AdvisoryWriteLock),
    }
}
