//! Record types for holding domain data.
//!
//! A [`Record`] is a cheap, cloneable handle: the working set, pending
//! operations and callers all share the same underlying state, so a record
//! returned by [`Store::create`](crate::Store::create) observes its own
//! transition from phantom to clean when the backend answers.

use crate::store::{Store, WeakStore};
use crate::{error::Result, Fields, Model};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// How a record reached its latest state, reported with `update` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// A field value changed
    Edit,
    /// Pending changes were reverted
    Reject,
    /// Pending changes were accepted
    Commit,
}

#[derive(Debug)]
struct RecordState {
    model: Arc<Model>,
    internal_id: String,
    data: Fields,
    /// Original values of fields changed since the last commit
    modified: Fields,
    phantom: bool,
    dirty: bool,
    stores: Vec<WeakStore>,
}

impl RecordState {
    fn has_id(&self) -> bool {
        !matches!(
            self.data.get(&self.model.id_property),
            None | Some(Value::Null)
        )
    }
}

/// A unit of mutable domain data.
#[derive(Clone)]
pub struct Record {
    inner: Arc<Mutex<RecordState>>,
}

impl Record {
    /// Create a record of `model` from `data`.
    ///
    /// Model defaults are filled in for absent fields. The record is phantom
    /// when `data` carries no identity.
    pub fn new(model: Arc<Model>, mut data: Fields) -> Self {
        model.apply_defaults(&mut data);
        let mut state = RecordState {
            model,
            internal_id: uuid::Uuid::new_v4().to_string(),
            data,
            modified: Fields::new(),
            phantom: false,
            dirty: false,
            stores: Vec::new(),
        };
        state.phantom = !state.has_id();

        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// The model this record belongs to.
    pub fn model(&self) -> Arc<Model> {
        Arc::clone(&self.inner.lock().model)
    }

    /// Client-side identifier, stable for the life of the record.
    pub fn internal_id(&self) -> String {
        self.inner.lock().internal_id.clone()
    }

    /// Backend-assigned identity, if any.
    pub fn id(&self) -> Option<Value> {
        let state = self.inner.lock();
        state
            .data
            .get(&state.model.id_property)
            .filter(|v| !v.is_null())
            .cloned()
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.inner.lock().data.get(field).cloned()
    }

    /// Snapshot of all field values.
    pub fn data(&self) -> Fields {
        self.inner.lock().data.clone()
    }

    /// Original values of the fields modified since the last commit.
    pub fn modified(&self) -> Fields {
        self.inner.lock().modified.clone()
    }

    /// Current values of the fields modified since the last commit.
    pub fn changes(&self) -> Fields {
        let state = self.inner.lock();
        state
            .modified
            .keys()
            .filter_map(|k| state.data.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    /// Whether `field` changed since the last commit.
    pub fn is_modified(&self, field: &str) -> bool {
        self.inner.lock().modified.contains_key(field)
    }

    /// Created locally and not yet persisted.
    pub fn is_phantom(&self) -> bool {
        self.inner.lock().phantom
    }

    /// Modified since the last successful sync or commit.
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    /// Validate the record's data against its model.
    pub fn validate(&self) -> Result<()> {
        let state = self.inner.lock();
        state.model.validate(&state.data)
    }

    /// Whether the record passes its model's field constraints.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Set a single field and notify joined stores.
    ///
    /// Setting a field to its current value does nothing.
    pub fn set(&self, field: &str, value: impl Into<Value>) {
        let mut values = Fields::new();
        values.insert(field.to_string(), value.into());
        self.set_values(values);
    }

    /// Set several fields at once; joined stores are notified once.
    pub fn set_values(&self, values: Fields) {
        let stores = {
            let mut state = self.inner.lock();
            let mut changed = false;

            for (field, value) in values {
                let current = state.data.get(&field).cloned().unwrap_or(Value::Null);
                if current == value {
                    continue;
                }
                changed = true;

                match state.modified.get(&field) {
                    Some(original) if *original == value => {
                        state.modified.remove(&field);
                    }
                    Some(_) => {}
                    None => {
                        state.modified.insert(field.clone(), current);
                    }
                }
                state.data.insert(field, value);
            }

            if !changed {
                return;
            }
            state.dirty = !state.modified.is_empty();
            state.stores.clone()
        };

        self.notify(stores, |store, record| store.after_edit(record));
    }

    /// Accept all pending changes. The record stays phantom while it has
    /// no id.
    pub fn commit(&self) {
        let stores = {
            let mut state = self.inner.lock();
            state.phantom = !state.has_id();
            state.dirty = false;
            state.modified.clear();
            state.stores.clone()
        };
        self.notify(stores, |store, record| store.after_commit(record));
    }

    /// Revert every field modified since the last commit.
    pub fn reject(&self) {
        let stores = {
            let mut state = self.inner.lock();
            let modified = std::mem::take(&mut state.modified);
            for (field, original) in modified {
                state.data.insert(field, original);
            }
            state.dirty = false;
            state.stores.clone()
        };
        self.notify(stores, |store, record| store.after_reject(record));
    }

    /// Merge backend values into the record and mark it clean, without
    /// notifying stores.
    pub(crate) fn accept_server_data(&self, server: Option<&Fields>) {
        let mut state = self.inner.lock();
        if let Some(fields) = server {
            for (field, value) in fields {
                state.data.insert(field.clone(), value.clone());
            }
        }
        state.modified.clear();
        state.dirty = false;
        state.phantom = false;
    }

    /// Link this record to `store` so edits are reported to it.
    pub fn join(&self, store: &Store) {
        let mut state = self.inner.lock();
        state.stores.retain(|s| s.is_alive());
        if !state.stores.iter().any(|s| s.points_to(store)) {
            state.stores.push(store.downgrade());
        }
    }

    /// Remove the link to `store`.
    pub fn unjoin(&self, store: &Store) {
        self.inner
            .lock()
            .stores
            .retain(|s| s.is_alive() && !s.points_to(store));
    }

    /// Whether this record reports its edits to `store`.
    pub fn is_joined_to(&self, store: &Store) -> bool {
        self.inner.lock().stores.iter().any(|s| s.points_to(store))
    }

    /// Whether two handles refer to the same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self, stores: Vec<WeakStore>, f: impl Fn(&Store, &Record)) {
        for store in stores.iter().filter_map(WeakStore::upgrade) {
            f(&store, self);
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Record")
            .field("model", &state.model.name)
            .field("internal_id", &state.internal_id)
            .field("data", &state.data)
            .field("phantom", &state.phantom)
            .field("dirty", &state.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldDef, FieldType};
    use serde_json::json;

    fn model() -> Arc<Model> {
        Arc::new(Model::new(
            "User",
            vec![
                FieldDef::required("name", FieldType::String),
                FieldDef::optional("age", FieldType::Int).with_default(0),
            ],
        ))
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn new_record_without_id_is_phantom() {
        let record = Record::new(model(), fields(json!({"name": "Alice"})));

        assert!(record.is_phantom());
        assert!(!record.is_dirty());
        assert_eq!(record.id(), None);
        assert_eq!(record.get("age"), Some(json!(0)));
    }

    #[test]
    fn record_with_id_is_not_phantom() {
        let record = Record::new(model(), fields(json!({"id": 7, "name": "Alice"})));

        assert!(!record.is_phantom());
        assert_eq!(record.id(), Some(json!(7)));
    }

    #[test]
    fn set_marks_dirty_and_tracks_original() {
        let record = Record::new(model(), fields(json!({"id": 1, "name": "Alice"})));
        record.set("name", "Alicia");

        assert!(record.is_dirty());
        assert!(record.is_modified("name"));
        assert_eq!(record.modified().get("name"), Some(&json!("Alice")));
        assert_eq!(record.changes().get("name"), Some(&json!("Alicia")));
    }

    #[test]
    fn set_same_value_is_noop() {
        let record = Record::new(model(), fields(json!({"id": 1, "name": "Alice"})));
        record.set("name", "Alice");

        assert!(!record.is_dirty());
        assert!(record.modified().is_empty());
    }

    #[test]
    fn setting_back_to_original_cleans_record() {
        let record = Record::new(model(), fields(json!({"id": 1, "name": "Alice"})));
        record.set("name", "Bob");
        record.set("name", "Alice");

        assert!(!record.is_dirty());
        assert!(!record.is_modified("name"));
    }

    #[test]
    fn reject_restores_values() {
        let record = Record::new(model(), fields(json!({"id": 1, "name": "Alice", "age": 3})));
        record.set("name", "Bob");
        record.set("age", 4);
        record.reject();

        assert!(!record.is_dirty());
        assert_eq!(record.get("name"), Some(json!("Alice")));
        assert_eq!(record.get("age"), Some(json!(3)));
    }

    #[test]
    fn commit_clears_dirty() {
        let record = Record::new(model(), fields(json!({"id": 4, "name": "Alice"})));
        record.set("name", "Bob");
        record.commit();

        assert!(!record.is_phantom());
        assert!(!record.is_dirty());
        assert_eq!(record.get("name"), Some(json!("Bob")));
    }

    #[test]
    fn commit_without_id_stays_phantom() {
        let record = Record::new(model(), fields(json!({"name": "Alice"})));
        record.set("name", "Bob");
        record.commit();

        assert!(record.is_phantom());
        assert!(!record.is_dirty());
    }

    #[test]
    fn commit_after_id_assigned_clears_phantom() {
        let record = Record::new(model(), fields(json!({"name": "Alice"})));
        record.set("id", 9);
        record.commit();

        assert!(!record.is_phantom());
    }

    #[test]
    fn accept_server_data_merges_identity() {
        let record = Record::new(model(), fields(json!({"name": "Alice"})));
        record.accept_server_data(Some(&fields(json!({"id": 42}))));

        assert!(!record.is_phantom());
        assert_eq!(record.id(), Some(json!(42)));
        assert_eq!(record.get("name"), Some(json!("Alice")));
    }

    #[test]
    fn validity_follows_model() {
        let valid = Record::new(model(), fields(json!({"name": "Alice"})));
        let invalid = Record::new(model(), fields(json!({"age": 3})));

        assert!(valid.is_valid());
        assert!(!invalid.is_valid());
    }

    #[test]
    fn clones_share_state() {
        let record = Record::new(model(), fields(json!({"id": 1, "name": "Alice"})));
        let other = record.clone();
        other.set("name", "Bob");

        assert!(record.ptr_eq(&other));
        assert_eq!(record.get("name"), Some(json!("Bob")));
        assert_ne!(
            record.internal_id(),
            Record::new(model(), Fields::new()).internal_id()
        );
    }
}
