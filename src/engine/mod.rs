//! Narrow interface to the underlying storage engine.
//!
//! The adapter delegates all durability, indexing, and transaction guarantees
//! to a collaborator engine consumed through the [`StorageEngine`] and
//! [`EngineConnection`] traits. The traits cover exactly what the adapter
//! needs: open a store, begin/commit/cancel a transaction, keyed reads and
//! writes, query execution, and post-commit change listeners.

mod memory;

pub use memory::MemoryEngine;

use crate::error::Result;
use crate::predicate::CompiledQuery;
use crate::types::{ClassSchema, StoreConfig, PRIMARY_KEY_FIELD};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A field value in the engine's native record representation.
///
/// Slots are typed by the declared schema; list fields hold scalar elements
/// of the declared kind. Null is represented by slot absence on the record.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<NativeValue>),
}

/// The engine's native representation of one record.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeRecord {
    class_name: String,
    values: BTreeMap<String, NativeValue>,
}

impl NativeRecord {
    /// Fresh record with only the primary key assigned.
    pub fn new(class_name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(
            PRIMARY_KEY_FIELD.to_string(),
            NativeValue::String(primary_key.into()),
        );
        Self {
            class_name: class_name.into(),
            values,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The immutable primary key.
    pub fn primary_key(&self) -> &str {
        match self.values.get(PRIMARY_KEY_FIELD) {
            Some(NativeValue::String(s)) => s,
            _ => "",
        }
    }

    /// Current value of a field, or None if the field is null.
    pub fn get(&self, field: &str) -> Option<&NativeValue> {
        self.values.get(field)
    }

    pub fn set(&mut self, field: &str, value: NativeValue) {
        self.values.insert(field.to_string(), value);
    }

    /// Set a field back to null.
    pub fn unset(&mut self, field: &str) {
        self.values.remove(field);
    }
}

/// Token identifying a registered change listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub u64);

/// Callback invoked by the engine after every committed change.
///
/// Callbacks run on the engine's notification context, not the caller's.
/// The engine makes no minimality guarantee: a commit that does not affect a
/// given result set still fires, and de-duplication is the subscriber's job.
pub type ChangeCallback = Box<dyn Fn() + Send + Sync>;

/// Opens engine connections for named stores.
pub trait StorageEngine: Send + Sync {
    /// Open one connection for the store described by `config`.
    ///
    /// The schema registry in the config is fixed for the connection's
    /// lifetime; the engine normalizes it (implicit `uuid` field) and rejects
    /// invalid declarations.
    fn open(&self, store_id: &str, config: &StoreConfig) -> Result<Arc<dyn EngineConnection>>;
}

/// One open connection to a storage engine.
///
/// # Invariants
///
/// - At most one transaction is in flight per connection; `begin` while one
///   is open is an error. All mutating calls require an open transaction.
/// - `commit` makes the transaction's writes visible and then notifies
///   change listeners; `cancel` restores the pre-transaction state exactly.
/// - `execute` observes uncommitted writes of the connection's own open
///   transaction (the engine serializes transactions per connection).
pub trait EngineConnection: Send + Sync {
    /// The normalized class schema, or `UnknownClass`.
    fn class_schema(&self, class_name: &str) -> Result<&ClassSchema>;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn cancel(&self) -> Result<()>;

    fn in_transaction(&self) -> bool;

    /// Allocate a new record under `primary_key`. Fails with `DuplicateKey`
    /// if the key already exists in the class.
    fn insert(&self, class_name: &str, primary_key: &str) -> Result<()>;

    /// Keyed lookup; absence is not an error.
    fn get(&self, class_name: &str, primary_key: &str) -> Result<Option<NativeRecord>>;

    /// Write back a record previously obtained from `get` or created by
    /// `insert`.
    fn put(&self, record: NativeRecord) -> Result<()>;

    /// Remove one record. Removing an absent key is a no-op.
    fn remove(&self, class_name: &str, primary_key: &str) -> Result<()>;

    /// Remove every record of every class.
    fn clear(&self) -> Result<()>;

    /// Execute a compiled query. A non-negative `limit` truncates the result
    /// set; a negative limit means unbounded. Each call is one full scan and
    /// increments the scan counter.
    fn execute(&self, query: &CompiledQuery, limit: i64) -> Result<Vec<NativeRecord>>;

    /// Register a post-commit change listener.
    fn add_listener(&self, callback: ChangeCallback) -> ListenerToken;

    /// Detach a listener; no further invocations happen after this returns.
    fn remove_listener(&self, token: ListenerToken);

    /// Storage location string for this connection.
    fn storage_path(&self) -> String;

    /// Number of query executions performed so far (statistics).
    fn scan_count(&self) -> u64;
}
