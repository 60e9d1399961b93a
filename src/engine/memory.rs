//! In-memory storage engine.
//!
//! Suitable for tests and ephemeral stores. Transactions take a shadow copy
//! of the live tables on `begin`; `cancel` restores the copy and `commit`
//! discards it and notifies change listeners on the committing thread.

use super::{ChangeCallback, EngineConnection, ListenerToken, NativeRecord, StorageEngine};
use crate::error::{AdapterError, Result};
use crate::predicate::CompiledQuery;
use crate::types::{ClassSchema, StoreConfig};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Class name -> primary key -> record. BTreeMaps keep scans deterministic.
type Tables = BTreeMap<String, BTreeMap<String, NativeRecord>>;

/// An in-memory storage engine.
pub struct MemoryEngine;

impl MemoryEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl StorageEngine for MemoryEngine {
    fn open(&self, store_id: &str, config: &StoreConfig) -> Result<Arc<dyn EngineConnection>> {
        let mut schema = Vec::with_capacity(config.schema.len());
        let mut tables = Tables::new();
        for class in &config.schema {
            let class = class.clone().normalized()?;
            tables.insert(class.name.clone(), BTreeMap::new());
            schema.push(class);
        }

        tracing::debug!(store_id, classes = schema.len(), "opening in-memory store");

        Ok(Arc::new(MemoryConnection {
            schema,
            location: config.storage_location(),
            tables: RwLock::new(tables),
            shadow: Mutex::new(None),
            listeners: RwLock::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            scans: AtomicU64::new(0),
        }))
    }
}

/// One open in-memory store.
pub struct MemoryConnection {
    /// Normalized schema, fixed at open time.
    schema: Vec<ClassSchema>,
    location: String,
    tables: RwLock<Tables>,
    /// Pre-transaction copy of the tables; Some while a transaction is open.
    shadow: Mutex<Option<Tables>>,
    listeners: RwLock<HashMap<u64, ChangeCallback>>,
    next_token: AtomicU64,
    scans: AtomicU64,
}

impl MemoryConnection {
    fn require_transaction(&self) -> Result<()> {
        if self.shadow.lock().is_none() {
            return Err(AdapterError::Engine("write outside transaction".into()));
        }
        Ok(())
    }

    fn notify_listeners(&self) {
        let listeners = self.listeners.read();
        for callback in listeners.values() {
            callback();
        }
    }
}

impl EngineConnection for MemoryConnection {
    fn class_schema(&self, class_name: &str) -> Result<&ClassSchema> {
        self.schema
            .iter()
            .find(|c| c.name == class_name)
            .ok_or_else(|| AdapterError::UnknownClass(class_name.to_string()))
    }

    fn begin(&self) -> Result<()> {
        let mut shadow = self.shadow.lock();
        if shadow.is_some() {
            return Err(AdapterError::Engine("transaction already in flight".into()));
        }
        *shadow = Some(self.tables.read().clone());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut shadow = self.shadow.lock();
        if shadow.take().is_none() {
            return Err(AdapterError::Engine("no open transaction".into()));
        }
        drop(shadow);
        self.notify_listeners();
        Ok(())
    }

    fn cancel(&self) -> Result<()> {
        let mut shadow = self.shadow.lock();
        match shadow.take() {
            Some(saved) => {
                *self.tables.write() = saved;
                Ok(())
            }
            None => Err(AdapterError::Engine("no open transaction".into())),
        }
    }

    fn in_transaction(&self) -> bool {
        self.shadow.lock().is_some()
    }

    fn insert(&self, class_name: &str, primary_key: &str) -> Result<()> {
        self.require_transaction()?;
        self.class_schema(class_name)?;

        let mut tables = self.tables.write();
        let table = tables
            .get_mut(class_name)
            .ok_or_else(|| AdapterError::UnknownClass(class_name.to_string()))?;
        if table.contains_key(primary_key) {
            return Err(AdapterError::DuplicateKey {
                class_name: class_name.to_string(),
                primary_key: primary_key.to_string(),
            });
        }
        table.insert(
            primary_key.to_string(),
            NativeRecord::new(class_name, primary_key),
        );
        Ok(())
    }

    fn get(&self, class_name: &str, primary_key: &str) -> Result<Option<NativeRecord>> {
        self.class_schema(class_name)?;
        let tables = self.tables.read();
        Ok(tables
            .get(class_name)
            .and_then(|table| table.get(primary_key))
            .cloned())
    }

    fn put(&self, record: NativeRecord) -> Result<()> {
        self.require_transaction()?;
        self.class_schema(record.class_name())?;

        let mut tables = self.tables.write();
        let table = tables
            .get_mut(record.class_name())
            .ok_or_else(|| AdapterError::UnknownClass(record.class_name().to_string()))?;
        table.insert(record.primary_key().to_string(), record);
        Ok(())
    }

    fn remove(&self, class_name: &str, primary_key: &str) -> Result<()> {
        self.require_transaction()?;
        self.class_schema(class_name)?;

        let mut tables = self.tables.write();
        if let Some(table) = tables.get_mut(class_name) {
            table.remove(primary_key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.require_transaction()?;
        let mut tables = self.tables.write();
        for table in tables.values_mut() {
            table.clear();
        }
        Ok(())
    }

    fn execute(&self, query: &CompiledQuery, limit: i64) -> Result<Vec<NativeRecord>> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.class_schema(query.class_name())?;

        let tables = self.tables.read();
        let table = tables
            .get(query.class_name())
            .ok_or_else(|| AdapterError::UnknownClass(query.class_name().to_string()))?;

        let mut results = Vec::new();
        for record in table.values() {
            if query.matches(record) {
                results.push(record.clone());
                if limit >= 0 && results.len() as i64 >= limit {
                    break;
                }
            }
        }
        Ok(results)
    }

    fn add_listener(&self, callback: ChangeCallback) -> ListenerToken {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.listeners.write().insert(token, callback);
        ListenerToken(token)
    }

    fn remove_listener(&self, token: ListenerToken) {
        self.listeners.write().remove(&token.0);
    }

    fn storage_path(&self) -> String {
        self.location.clone()
    }

    fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }
}
