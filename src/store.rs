//! One open store: CRUD, query, and transaction primitives.

use crate::engine::{EngineConnection, StorageEngine};
use crate::error::{AdapterError, Result};
use crate::marshal;
use crate::predicate::{self, PredicateTerm};
use crate::subscriptions::SubscriptionManager;
use crate::types::{ChangeEvent, FieldMap, StoreConfig};
use crossbeam_channel::Sender;
use std::sync::Arc;

/// One independently configured, named store.
///
/// Owns exactly one engine connection and the subscriptions registered on it.
/// Every mutating verb runs inside exactly one engine transaction; on any
/// failure inside that scope the transaction is cancelled before the error
/// surfaces, so no partial write is ever visible.
///
/// Mutating verbs must not be issued concurrently against the same store:
/// the engine serializes one transaction per connection and rejects a second
/// `begin`. That discipline is the caller's responsibility.
pub struct StoreInstance {
    store_id: String,
    conn: Arc<dyn EngineConnection>,
    subscriptions: SubscriptionManager,
}

impl std::fmt::Debug for StoreInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreInstance")
            .field("store_id", &self.store_id)
            .finish_non_exhaustive()
    }
}

impl StoreInstance {
    /// Open a store through the engine and wire up its subscription manager.
    pub fn open(
        engine: &dyn StorageEngine,
        store_id: &str,
        config: &StoreConfig,
        events: Sender<ChangeEvent>,
    ) -> Result<Self> {
        let conn = engine.open(store_id, config)?;
        let subscriptions =
            SubscriptionManager::new(store_id.to_string(), Arc::clone(&conn), events);
        Ok(Self {
            store_id: store_id.to_string(),
            conn,
            subscriptions,
        })
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Storage location string (the `filePath` verb).
    pub fn storage_path(&self) -> String {
        self.conn.storage_path()
    }

    pub(crate) fn conn(&self) -> &Arc<dyn EngineConnection> {
        &self.conn
    }

    /// Run `f` inside one transaction, cancelling on any error.
    pub(crate) fn in_write<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.begin()?;
        match f() {
            Ok(value) => {
                self.conn.commit()?;
                Ok(value)
            }
            Err(e) => {
                // Roll back before surfacing; a failed cancel would mean a
                // wedged engine connection and is not recoverable here anyway.
                let _ = self.conn.cancel();
                Err(e)
            }
        }
    }

    /// Create a new record keyed by `primary_key` and apply `fields`.
    ///
    /// Fails with `DuplicateKey` if the key already exists.
    pub fn create(&self, class_name: &str, primary_key: &str, fields: &FieldMap) -> Result<()> {
        let schema = self.conn.class_schema(class_name)?.clone();
        self.in_write(|| {
            self.conn.insert(class_name, primary_key)?;
            let mut record = self
                .conn
                .get(class_name, primary_key)?
                .ok_or_else(|| AdapterError::Engine("inserted record vanished".into()))?;
            marshal::apply_map(&schema, &mut record, fields)?;
            self.conn.put(record)
        })
    }

    /// Single-key lookup; absence is not an error.
    pub fn find(&self, class_name: &str, primary_key: &str) -> Result<Option<FieldMap>> {
        let schema = self.conn.class_schema(class_name)?;
        Ok(self
            .conn
            .get(class_name, primary_key)?
            .map(|record| marshal::record_to_map(schema, &record)))
    }

    /// Transactionally apply `fields` and return the post-update record.
    ///
    /// Fails with `RecordNotFound` if the key is absent; nothing is written.
    pub fn update(&self, class_name: &str, primary_key: &str, fields: &FieldMap) -> Result<FieldMap> {
        let schema = self.conn.class_schema(class_name)?.clone();
        let mut record =
            self.conn
                .get(class_name, primary_key)?
                .ok_or_else(|| AdapterError::RecordNotFound {
                    class_name: class_name.to_string(),
                    primary_key: primary_key.to_string(),
                })?;

        self.in_write(|| {
            marshal::apply_map(&schema, &mut record, fields)?;
            self.conn.put(record.clone())
        })?;

        Ok(marshal::record_to_map(&schema, &record))
    }

    /// Transactionally remove one record.
    ///
    /// Fails with `RecordNotFound` if the key is absent.
    pub fn delete(&self, class_name: &str, primary_key: &str) -> Result<()> {
        if self.conn.get(class_name, primary_key)?.is_none() {
            return Err(AdapterError::RecordNotFound {
                class_name: class_name.to_string(),
                primary_key: primary_key.to_string(),
            });
        }
        self.in_write(|| self.conn.remove(class_name, primary_key))
    }

    /// Compile and execute a predicate against one class.
    ///
    /// Returns the (possibly capped) records plus the unlimited total count.
    /// When a non-negative limit is supplied the query runs twice: once
    /// unbounded for the count and once truncated for the page. Known
    /// double-scan behavior, preserved deliberately; callers needing both a
    /// total and a page pay for two scans.
    pub fn query(
        &self,
        class_name: &str,
        terms: &[PredicateTerm],
        limit: i64,
    ) -> Result<(Vec<FieldMap>, usize)> {
        let schema = self.conn.class_schema(class_name)?;
        let query = predicate::compile(class_name, terms)?;

        let unlimited = self.conn.execute(&query, -1)?;
        let count = unlimited.len();
        let rows = if limit >= 0 {
            self.conn.execute(&query, limit)?
        } else {
            unlimited
        };

        let results = rows
            .iter()
            .map(|record| marshal::record_to_map(schema, record))
            .collect();
        Ok((results, count))
    }

    /// Transactionally clear every record of every class.
    pub fn delete_all(&self) -> Result<()> {
        self.in_write(|| self.conn.clear())
    }

    /// Tear down all subscriptions, then clear the store. Reset path.
    pub fn reset(&self) -> Result<()> {
        self.subscriptions.teardown();
        self.delete_all()
    }
}
