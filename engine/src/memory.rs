//! In-process proxy keeping rows in a table keyed by id.
//!
//! Every operation completes before the proxy call returns.

use crate::{
    sorter::SortState, Batch, BatchListeners, BatchOptions, Completion, Fields, Model, Operation,
    Proxy, Record, ResultSet,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Row {
    /// Insertion sequence, used for unsorted reads
    seq: u64,
    data: Fields,
}

/// Rows keyed by the string form of their id.
#[derive(Debug, Default)]
struct MemoryTable {
    rows: HashMap<String, Row>,
    next_seq: u64,
    next_id: u64,
}

impl MemoryTable {
    fn insert(&mut self, key: String, data: Fields) {
        if let Ok(n) = key.parse::<u64>() {
            self.next_id = self.next_id.max(n);
        }
        self.next_seq += 1;
        let seq = match self.rows.get(&key) {
            Some(existing) => existing.seq,
            None => self.next_seq,
        };
        self.rows.insert(key, Row { seq, data });
    }

    fn assign_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn ordered(&self) -> Vec<Fields> {
        let mut rows: Vec<&Row> = self.rows.values().collect();
        rows.sort_by_key(|row| row.seq);
        rows.into_iter().map(|row| row.data.clone()).collect()
    }
}

fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A proxy backed by an in-memory table.
#[derive(Debug)]
pub struct MemoryProxy {
    model: Arc<Model>,
    table: Mutex<MemoryTable>,
}

impl MemoryProxy {
    /// Create an empty proxy for records of `model`.
    pub fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            table: Mutex::new(MemoryTable::default()),
        }
    }

    /// Create a proxy seeded with `rows`. Rows without an id get one.
    pub fn with_data(model: Arc<Model>, rows: Vec<Fields>) -> Self {
        let proxy = Self::new(model);
        {
            let mut table = proxy.table.lock();
            for mut row in rows {
                let key = proxy.key_of(&row).unwrap_or_else(|| {
                    let id = table.assign_id();
                    row.insert(proxy.model.id_property.clone(), Value::from(id));
                    id.to_string()
                });
                table.insert(key, row);
            }
        }
        proxy
    }

    /// All rows in insertion order.
    pub fn rows(&self) -> Vec<Fields> {
        self.table.lock().ordered()
    }

    pub fn len(&self) -> usize {
        self.table.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_of(&self, data: &Fields) -> Option<String> {
        data.get(&self.model.id_property).and_then(id_key)
    }

    fn keys_of(&self, records: &[Record]) -> std::result::Result<Vec<String>, String> {
        records
            .iter()
            .map(|record| {
                record
                    .id()
                    .as_ref()
                    .and_then(id_key)
                    .ok_or_else(|| "record has no id".to_string())
            })
            .collect()
    }

    fn complete(
        mut operation: Operation,
        done: Completion,
        result: std::result::Result<ResultSet, String>,
    ) {
        let outcome = match result {
            Ok(result_set) => {
                operation.set_result_set(result_set);
                operation.set_successful()
            }
            Err(message) => {
                tracing::warn!(
                    action = %operation.action(),
                    error = %message,
                    "memory proxy operation failed"
                );
                operation.set_exception(message)
            }
        };
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "operation completed twice");
            return;
        }
        done(operation);
    }

    fn run_read(&self, operation: &Operation) -> ResultSet {
        let filters = operation.filters();
        let mut records: Vec<Record> = self
            .rows()
            .into_iter()
            .map(|row| Record::new(Arc::clone(&self.model), row))
            .filter(|record| filters.iter().all(|f| f.matches(record)))
            .collect();

        if !operation.sorters().is_empty() {
            let compare = SortState::new(operation.sorters().to_vec()).comparator();
            records.sort_by(|a, b| compare(a, b));
        }

        let total = records.len() as u64;
        let start = match (operation.start(), operation.page(), operation.limit()) {
            (Some(start), _, _) => start,
            (None, Some(page), Some(limit)) => page.saturating_sub(1).saturating_mul(limit),
            _ => 0,
        };
        let limit = operation.limit().unwrap_or(usize::MAX);

        let page = records
            .iter()
            .skip(start)
            .take(limit)
            .map(Record::data)
            .collect();
        ResultSet::new(page).with_total(total)
    }

    fn run_create(&self, operation: &Operation) -> ResultSet {
        let mut table = self.table.lock();
        let created = operation
            .records()
            .iter()
            .map(|record| {
                let mut data = record.data();
                let key = self.key_of(&data).unwrap_or_else(|| {
                    let id = table.assign_id();
                    data.insert(self.model.id_property.clone(), Value::from(id));
                    id.to_string()
                });
                table.insert(key, data.clone());
                data
            })
            .collect();
        ResultSet::new(created)
    }

    fn run_update(&self, operation: &Operation) -> std::result::Result<ResultSet, String> {
        let keys = self.keys_of(operation.records())?;
        let mut table = self.table.lock();
        if let Some(missing) = keys.iter().find(|k| !table.rows.contains_key(*k)) {
            return Err(format!("no row with id {missing}"));
        }

        let updated = keys
            .into_iter()
            .zip(operation.records())
            .filter_map(|(key, record)| {
                let row = table.rows.get_mut(&key)?;
                for (field, value) in record.data() {
                    row.data.insert(field, value);
                }
                Some(row.data.clone())
            })
            .collect();
        Ok(ResultSet::new(updated))
    }

    fn run_destroy(&self, operation: &Operation) -> std::result::Result<ResultSet, String> {
        let keys = self.keys_of(operation.records())?;
        let mut table = self.table.lock();
        if let Some(missing) = keys.iter().find(|k| !table.rows.contains_key(*k)) {
            return Err(format!("no row with id {missing}"));
        }
        for key in &keys {
            table.rows.remove(key);
        }
        Ok(ResultSet::default())
    }
}

impl Proxy for MemoryProxy {
    fn read(&self, operation: Operation, done: Completion) {
        let result = self.run_read(&operation);
        tracing::debug!(rows = result.records.len(), total = ?result.total, "memory read");
        Self::complete(operation, done, Ok(result));
    }

    fn create(&self, operation: Operation, done: Completion) {
        let result = self.run_create(&operation);
        Self::complete(operation, done, Ok(result));
    }

    fn update(&self, operation: Operation, done: Completion) {
        let result = self.run_update(&operation);
        Self::complete(operation, done, result);
    }

    fn destroy(&self, operation: Operation, done: Completion) {
        let result = self.run_destroy(&operation);
        Self::complete(operation, done, result);
    }

    fn batch(self: Arc<Self>, options: BatchOptions, listeners: BatchListeners) -> Batch {
        Batch::run(self, options, listeners)
    }
}
