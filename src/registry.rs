//! Table of open named stores.

use crate::engine::StorageEngine;
use crate::error::{AdapterError, Result};
use crate::store::StoreInstance;
use crate::types::{ChangeEvent, StoreConfig};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-wide table of open named stores, held explicitly by the host.
///
/// Not a singleton: construct one with [`StoreRegistry::new`], keep the
/// returned receiver as the single designated consumer of change events, and
/// pass the registry by reference to whatever dispatches commands.
pub struct StoreRegistry {
    engine: Arc<dyn StorageEngine>,
    stores: RwLock<HashMap<String, Arc<StoreInstance>>>,
    events: Sender<ChangeEvent>,
}

impl StoreRegistry {
    /// Create a registry backed by `engine`.
    ///
    /// The returned receiver carries every [`ChangeEvent`] of every store
    /// opened through this registry, in strict per-subscription order.
    pub fn new(engine: Arc<dyn StorageEngine>) -> (Self, Receiver<ChangeEvent>) {
        let (events, receiver) = unbounded();
        (
            Self {
                engine,
                stores: RwLock::new(HashMap::new()),
                events,
            },
            receiver,
        )
    }

    /// Open (or replace) the store registered under `store_id`.
    ///
    /// Re-opening an already-open id closes the prior instance first: its
    /// subscriptions are torn down so no stale events can arrive once the
    /// replacement serves commands.
    pub fn open(&self, store_id: &str, config: &StoreConfig) -> Result<()> {
        if let Some(previous) = self.stores.write().remove(store_id) {
            tracing::debug!(store_id, "replacing already-open store");
            previous.subscriptions().teardown();
        }

        let store = StoreInstance::open(
            self.engine.as_ref(),
            store_id,
            config,
            self.events.clone(),
        )?;
        self.stores
            .write()
            .insert(store_id.to_string(), Arc::new(store));
        Ok(())
    }

    /// Resolve a command's target store.
    pub fn resolve(&self, store_id: &str) -> Result<Arc<StoreInstance>> {
        self.stores
            .read()
            .get(store_id)
            .cloned()
            .ok_or_else(|| AdapterError::StoreNotFound(store_id.to_string()))
    }

    /// Reset every open store and clear the registry.
    ///
    /// Each store's subscriptions are invalidated atomically with its data;
    /// used for full-environment teardown between host sessions. Every store
    /// is reset even if one fails: the registry is always left empty, and the
    /// first failure is surfaced after the sweep completes.
    pub fn reset_all(&self) -> Result<()> {
        let mut stores = self.stores.write();
        let mut first_error = None;
        for (store_id, store) in stores.iter() {
            if let Err(e) = store.reset() {
                tracing::warn!(store_id = %store_id, error = %e, "store reset failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        stores.clear();
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.read().is_empty()
    }
}
