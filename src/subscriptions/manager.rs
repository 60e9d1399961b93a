//! Subscription manager: one per store.

use crate::engine::{EngineConnection, ListenerToken};
use crate::error::{AdapterError, Result};
use crate::marshal;
use crate::predicate::{self, CompiledQuery, PredicateTerm};
use crate::types::{ChangeEvent, FieldMap};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Shared state of one live query, reachable from the engine's change
/// listener. Holds the connection weakly so the listener table inside the
/// connection never keeps the connection itself alive.
struct LiveQuery {
    store_id: String,
    subscription_id: String,
    conn: Weak<dyn EngineConnection>,
    events: Sender<ChangeEvent>,
    query: CompiledQuery,
    limit: i64,
    /// Last pushed snapshot, for de-duplication by content equality. The
    /// lock also serializes refreshes, keeping delivery in state order.
    last: Mutex<Option<ChangeEvent>>,
}

impl LiveQuery {
    /// Re-run the live query and push a snapshot if it changed.
    ///
    /// The engine notifies on every commit without a minimality guarantee,
    /// so this is the one place no-op notifications are filtered out.
    ///
    /// The whole snapshot-compare-send sequence runs under the `last` lock:
    /// refreshes of one subscription are serialized, so a refresh that
    /// started earlier cannot deliver its (staler) snapshot after a newer
    /// one. The initial snapshot on subscribe races engine notifications and
    /// needs this as much as the listener path does.
    fn refresh(&self) {
        let Some(conn) = self.conn.upgrade() else {
            return;
        };

        let mut last = self.last.lock();

        let snapshot = match self.snapshot(conn.as_ref()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    subscription_id = %self.subscription_id,
                    error = %e,
                    "live query refresh failed"
                );
                return;
            }
        };

        if last.as_ref() == Some(&snapshot) {
            return;
        }
        *last = Some(snapshot.clone());

        if self.events.send(snapshot).is_err() {
            tracing::warn!(
                subscription_id = %self.subscription_id,
                "change event dropped: delivery channel disconnected"
            );
        }
    }

    /// Marshal the full current result set, capped by the limit, with the
    /// unlimited total count. Same double-scan contract as one-shot queries.
    fn snapshot(&self, conn: &dyn EngineConnection) -> Result<ChangeEvent> {
        let schema = conn.class_schema(self.query.class_name())?;

        let unlimited = conn.execute(&self.query, -1)?;
        let count = unlimited.len();
        let rows = if self.limit >= 0 {
            conn.execute(&self.query, self.limit)?
        } else {
            unlimited
        };

        let results: Vec<FieldMap> = rows
            .iter()
            .map(|record| marshal::record_to_map(schema, record))
            .collect();

        Ok(ChangeEvent {
            store_id: self.store_id.clone(),
            subscription_id: self.subscription_id.clone(),
            results,
            count,
        })
    }
}

/// Registers and serves the live queries of one store.
///
/// The engine's listener callback keeps the [`LiveQuery`] alive; the manager
/// only tracks the listener token per subscription id.
pub struct SubscriptionManager {
    store_id: String,
    conn: Arc<dyn EngineConnection>,
    events: Sender<ChangeEvent>,
    subscriptions: Mutex<HashMap<String, ListenerToken>>,
}

impl SubscriptionManager {
    pub(crate) fn new(
        store_id: String,
        conn: Arc<dyn EngineConnection>,
        events: Sender<ChangeEvent>,
    ) -> Self {
        Self {
            store_id,
            conn,
            events,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a live query under `subscription_id` and push its initial
    /// snapshot immediately.
    ///
    /// Fails with `DuplicateSubscription` if the id is already registered on
    /// this store. Predicate compilation errors surface before anything is
    /// registered.
    pub fn subscribe(
        &self,
        subscription_id: &str,
        class_name: &str,
        terms: &[PredicateTerm],
        limit: i64,
    ) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock();
        if subscriptions.contains_key(subscription_id) {
            return Err(AdapterError::DuplicateSubscription(
                subscription_id.to_string(),
            ));
        }

        self.conn.class_schema(class_name)?;
        let query = predicate::compile(class_name, terms)?;

        let live = Arc::new(LiveQuery {
            store_id: self.store_id.clone(),
            subscription_id: subscription_id.to_string(),
            conn: Arc::downgrade(&self.conn),
            events: self.events.clone(),
            query,
            limit,
            last: Mutex::new(None),
        });

        let listener = Arc::clone(&live);
        let token = self.conn.add_listener(Box::new(move || listener.refresh()));
        subscriptions.insert(subscription_id.to_string(), token);
        drop(subscriptions);

        tracing::debug!(
            store_id = %self.store_id,
            subscription_id,
            class_name,
            "subscription registered"
        );

        live.refresh();
        Ok(())
    }

    /// Detach a live query; no further events are delivered for its id.
    ///
    /// Fails with `SubscriptionNotFound` if the id is unknown.
    pub fn unsubscribe(&self, subscription_id: &str) -> Result<()> {
        let removed = self.subscriptions.lock().remove(subscription_id);
        match removed {
            Some(token) => {
                self.conn.remove_listener(token);
                tracing::debug!(
                    store_id = %self.store_id,
                    subscription_id,
                    "subscription removed"
                );
                Ok(())
            }
            None => Err(AdapterError::SubscriptionNotFound(
                subscription_id.to_string(),
            )),
        }
    }

    /// Remove every subscription of this store, without per-id errors.
    /// Store reset and close-before-replace path.
    pub fn teardown(&self) {
        let mut subscriptions = self.subscriptions.lock();
        for (_, token) in subscriptions.drain() {
            self.conn.remove_listener(token);
        }
    }

    pub fn count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
