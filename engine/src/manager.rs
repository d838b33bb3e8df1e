//! Process-wide lookup of stores by id.

use crate::store::{Store, WeakStore};
use crate::StoreId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::OnceLock;

static STORES: OnceLock<Mutex<HashMap<StoreId, WeakStore>>> = OnceLock::new();

fn stores() -> &'static Mutex<HashMap<StoreId, WeakStore>> {
    STORES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Registry of live stores keyed by store id.
///
/// Entries are weak: the manager never keeps a store alive.
pub struct StoreManager;

impl StoreManager {
    /// Register `store` under its id. Stores without an id are ignored; a
    /// store registered under an id already in use replaces the old entry.
    pub fn register(store: &Store) {
        let Some(id) = store.store_id() else {
            return;
        };
        let previous = stores().lock().insert(id.clone(), store.downgrade());
        if previous.is_some_and(|p| p.is_alive() && !p.points_to(store)) {
            tracing::warn!(store_id = %id, "store id already registered, replacing");
        }
        tracing::info!(store_id = %id, "store registered");
    }

    /// Remove `store`'s entry, if it is still the one registered under its id.
    pub fn unregister(store: &Store) {
        let Some(id) = store.store_id() else {
            return;
        };
        let mut map = stores().lock();
        if map.get(id).is_some_and(|entry| entry.points_to(store)) {
            map.remove(id);
            tracing::info!(store_id = %id, "store unregistered");
        }
    }

    /// Find a live store by id.
    pub fn lookup(id: &str) -> Option<Store> {
        stores().lock().get(id).and_then(WeakStore::upgrade)
    }

    /// Ids of every live registered store.
    pub fn ids() -> Vec<StoreId> {
        stores()
            .lock()
            .iter()
            .filter(|(_, store)| store.is_alive())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop the entry for `id` if its store is gone.
    pub(crate) fn prune(id: &str) {
        let mut map = stores().lock();
        if map.get(id).is_some_and(|entry| !entry.is_alive()) {
            map.remove(id);
        }
    }
}
