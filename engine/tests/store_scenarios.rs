//! Store behaviour against a proxy whose completions the test controls.
//!
//! `ScriptedProxy` queues every operation it receives; each test decides
//! when, and how, the backend answers.

use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tether_engine::{
    Action, Batch, BatchListeners, BatchOptions, BatchUpdateMode, Completion, EventName, FieldDef,
    FieldType, Fields, MemoryProxy, Model, Operation, OperationOptions, Proxy, Record, Registry,
    ResultSet, Store, StoreConfig, StoreEvent, StoreManager,
};

#[derive(Default)]
struct ScriptedProxy {
    pending: Mutex<VecDeque<(Operation, Completion)>>,
    batches: AtomicUsize,
}

impl ScriptedProxy {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn pending_actions(&self) -> Vec<Action> {
        self.pending.lock().iter().map(|(op, _)| op.action()).collect()
    }

    fn calls(&self) -> usize {
        self.pending.lock().len()
    }

    fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Complete the oldest queued operation successfully with `rows`.
    fn succeed(&self, rows: Vec<Fields>) -> Action {
        let (mut op, done) = self.pop();
        let action = op.action();
        op.set_result_set(ResultSet::new(rows));
        op.set_successful().unwrap();
        done(op);
        action
    }

    /// Complete the oldest queued operation with an error.
    fn fail(&self, message: &str) -> Action {
        let (mut op, done) = self.pop();
        let action = op.action();
        op.set_exception(message).unwrap();
        done(op);
        action
    }

    fn pop(&self) -> (Operation, Completion) {
        let next = self.pending.lock().pop_front();
        next.expect("no pending operation")
    }

    fn enqueue(&self, op: Operation, done: Completion) {
        self.pending.lock().push_back((op, done));
    }
}

impl Proxy for ScriptedProxy {
    fn read(&self, op: Operation, done: Completion) {
        self.enqueue(op, done)
    }

    fn create(&self, op: Operation, done: Completion) {
        self.enqueue(op, done)
    }

    fn update(&self, op: Operation, done: Completion) {
        self.enqueue(op, done)
    }

    fn destroy(&self, op: Operation, done: Completion) {
        self.enqueue(op, done)
    }

    fn batch(self: Arc<Self>, options: BatchOptions, listeners: BatchListeners) -> Batch {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Batch::run(self, options, listeners)
    }
}

fn model() -> Arc<Model> {
    Arc::new(Model::new(
        "Task",
        vec![
            FieldDef::required("title", FieldType::String),
            FieldDef::optional("done", FieldType::Bool).with_default(false),
        ],
    ))
}

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

fn scripted(config: StoreConfig) -> (Store, Arc<ScriptedProxy>) {
    let proxy = ScriptedProxy::new();
    let store = Store::new(model(), proxy.clone(), config);
    (store, proxy)
}

/// Records of the store's model, added without going through the proxy.
fn persisted(store: &Store, ids: &[u64]) -> Vec<Record> {
    let records: Vec<Record> = ids
        .iter()
        .map(|id| {
            Record::new(
                store.model().clone(),
                fields(json!({"id": id, "title": format!("task {id}")})),
            )
        })
        .collect();
    store.add(records.clone());
    records
}

fn log_events(store: &Store, events: &[EventName]) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for event in events {
        let log = Arc::clone(&log);
        store.on(*event, move |_, e| log.lock().push(e.name().to_string()));
    }
    log
}

fn capture_sync_options(store: &Store) -> Arc<Mutex<Option<(usize, usize, usize)>>> {
    let seen = Arc::new(Mutex::new(None));
    let s = Arc::clone(&seen);
    store.on(EventName::BeforeSync, move |_, event| {
        if let StoreEvent::BeforeSync { options } = event {
            let len = |set: &Option<Vec<Record>>| set.as_ref().map_or(0, Vec::len);
            *s.lock() = Some((len(&options.create), len(&options.update), len(&options.destroy)));
        }
    });
    seen
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn load_of_three_records() {
    let (store, proxy) = scripted(StoreConfig::default());
    let loaded = Arc::new(Mutex::new(None));
    let l = Arc::clone(&loaded);
    store.on(EventName::Load, move |_, event| {
        if let StoreEvent::Load { records, success, .. } = event {
            *l.lock() = Some((records.len(), *success));
        }
    });

    store.load(OperationOptions::default());
    assert!(store.is_loading());
    assert_eq!(proxy.pending_actions(), vec![Action::Read]);

    proxy.succeed(vec![
        fields(json!({"id": 1, "title": "a"})),
        fields(json!({"id": 2, "title": "b"})),
        fields(json!({"id": 3, "title": "c"})),
    ]);

    assert_eq!(*loaded.lock(), Some((3, true)));
    assert_eq!(store.count(), 3);
    assert!(!store.is_loading());
}

#[test]
fn vetoed_load_issues_no_read() {
    let (store, proxy) = scripted(StoreConfig::default());
    store.on(EventName::BeforeLoad, |_, _| false);

    assert!(store.load(OperationOptions::default()).is_none());
    assert_eq!(proxy.calls(), 0);
    assert!(!store.is_loading());
}

#[test]
fn failed_load_keeps_working_set() {
    let (store, proxy) = scripted(StoreConfig::default());
    persisted(&store, &[1]);
    let outcome = Arc::new(Mutex::new(None));
    let o = Arc::clone(&outcome);

    store.load(OperationOptions::default().callback(move |_, _, op, success| {
        *o.lock() = Some((success, op.error().map(String::from)));
    }));
    proxy.fail("timeout");

    assert_eq!(store.count(), 1);
    assert!(!store.is_loading());
    assert_eq!(*outcome.lock(), Some((false, Some("timeout".to_string()))));
}

#[test]
fn load_carries_filters_sorters_and_paging() {
    let config = StoreConfig::from_json(
        r#"{
            "filters": [{"property": "title", "value": "a"}],
            "sorters": [{"property": "title", "direction": "DESC"}]
        }"#,
    )
    .unwrap();
    let (store, proxy) = scripted(config);
    let seen = Arc::new(Mutex::new(None));
    let s = Arc::clone(&seen);
    store.on(EventName::BeforeLoad, move |_, event| {
        if let StoreEvent::BeforeLoad { operation } = event {
            *s.lock() = Some((
                operation.filters().len(),
                operation.sorters().len(),
                operation.limit(),
                operation.filters()[0].root().to_string(),
            ));
        }
    });

    store.load(OperationOptions::default().limit(25));

    assert_eq!(*seen.lock(), Some((1, 1, Some(25), "data".to_string())));
    assert_eq!(proxy.calls(), 1);
}

// ============================================================================
// Create
// ============================================================================

#[test]
fn created_record_is_phantom_until_create_succeeds() {
    let (store, proxy) = scripted(StoreConfig::default());

    let record = store.create(fields(json!({"title": "write docs"})), OperationOptions::default());
    assert!(record.is_phantom());
    assert_eq!(record.get("done"), Some(json!(false)));
    assert_eq!(proxy.pending_actions(), vec![Action::Create]);

    proxy.succeed(vec![fields(json!({"id": 10}))]);

    assert!(!record.is_phantom());
    assert!(!record.is_dirty());
    assert_eq!(record.id(), Some(json!(10)));
    assert_eq!(record.get("title"), Some(json!("write docs")));
}

#[test]
fn failed_create_leaves_record_phantom() {
    let (store, proxy) = scripted(StoreConfig::default());
    let result = Arc::new(Mutex::new(None));
    let r = Arc::clone(&result);

    let record = store.create(
        fields(json!({"title": "x"})),
        OperationOptions::default().callback(move |_, records, _, success| {
            *r.lock() = Some((records.len(), success));
        }),
    );
    let writes = log_events(&store, &[EventName::Write, EventName::DataChanged]);
    proxy.fail("duplicate");

    assert!(record.is_phantom());
    assert_eq!(*result.lock(), Some((1, false)));
    assert!(writes.lock().is_empty());
}

#[test]
fn create_then_immediate_sync_includes_new_record() {
    let (store, proxy) = scripted(StoreConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    store.on(EventName::BeforeSync, move |_, event| {
        if let StoreEvent::BeforeSync { options } = event {
            s.lock().extend(options.create.clone().unwrap_or_default());
        }
    });

    let record = store.create(fields(json!({"title": "x"})), OperationOptions::default());
    store.sync();

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].ptr_eq(&record));
    assert!(record.is_phantom());
    assert_eq!(proxy.pending_actions(), vec![Action::Create, Action::Create]);
}

// ============================================================================
// Sync
// ============================================================================

#[test]
fn sync_options_hold_only_non_empty_sets() {
    let (store, proxy) = scripted(StoreConfig::default());
    let records = persisted(&store, &[1, 2]);
    records[0].set("title", "changed");
    records[1].set("done", true);
    store.add(vec![Record::new(store.model().clone(), fields(json!({"title": "new"})))]);
    let seen = capture_sync_options(&store);

    store.sync();

    assert_eq!(*seen.lock(), Some((1, 2, 0)));
    assert_eq!(proxy.batches(), 1);
}

#[test]
fn invalid_records_are_not_synced() {
    let (store, proxy) = scripted(StoreConfig::default());
    store.add(vec![Record::new(store.model().clone(), Fields::new())]);

    assert!(store.sync().is_none());
    assert_eq!(proxy.batches(), 0);
}

#[test]
fn empty_sync_is_silent() {
    let (store, proxy) = scripted(StoreConfig::default());
    persisted(&store, &[1, 2]);
    let before = log_events(&store, &[EventName::BeforeSync]);

    assert!(store.sync().is_none());
    assert!(before.lock().is_empty());
    assert_eq!(proxy.batches(), 0);
}

#[test]
fn vetoed_sync_issues_no_batch() {
    let (store, proxy) = scripted(StoreConfig::default());
    persisted(&store, &[1])[0].set("title", "x");
    store.on(EventName::BeforeSync, |_, _| false);

    assert!(store.sync().is_none());
    assert_eq!(proxy.batches(), 0);
    assert_eq!(proxy.calls(), 0);
}

#[test]
fn operation_mode_reconciles_each_operation() {
    let (store, proxy) = scripted(StoreConfig::default());
    let records = persisted(&store, &[1, 2]);
    records[0].set("title", "edited");
    store.remove(&records[1]);
    let phantom = Record::new(store.model().clone(), fields(json!({"title": "new"})));
    store.add(vec![phantom.clone()]);
    let log = log_events(&store, &[EventName::Write, EventName::DataChanged]);

    let batch = store.sync().unwrap();
    assert_eq!(proxy.pending_actions(), vec![Action::Create]);

    proxy.succeed(vec![fields(json!({"id": 3}))]);
    assert!(!phantom.is_phantom());
    assert_eq!(*log.lock(), vec!["write", "datachanged"]);

    assert_eq!(proxy.succeed(Vec::new()), Action::Update);
    assert!(!records[0].is_dirty());

    assert_eq!(proxy.succeed(Vec::new()), Action::Destroy);
    assert!(store.removed_records().is_empty());

    assert_eq!(
        *log.lock(),
        vec!["write", "datachanged", "write", "datachanged", "write", "datachanged"]
    );
    assert!(batch.is_complete());
}

#[test]
fn complete_mode_fires_one_datachanged() {
    let (store, proxy) =
        scripted(StoreConfig::new().with_batch_update_mode(BatchUpdateMode::Complete));
    let records = persisted(&store, &[1]);
    store.remove(&records[0]);
    let phantom = Record::new(store.model().clone(), fields(json!({"title": "new"})));
    store.add(vec![phantom.clone()]);
    let log = log_events(&store, &[EventName::Write, EventName::DataChanged]);

    store.sync().unwrap();
    proxy.succeed(vec![fields(json!({"id": 2}))]);

    // nothing is reconciled until the batch completes
    assert!(log.lock().is_empty());
    assert!(phantom.is_phantom());

    proxy.succeed(Vec::new());

    assert_eq!(*log.lock(), vec!["write", "write", "datachanged"]);
    assert!(!phantom.is_phantom());
    assert!(store.removed_records().is_empty());
}

#[test]
fn removed_cache_survives_failed_destroy() {
    let (store, proxy) = scripted(StoreConfig::default());
    let records = persisted(&store, &[1, 2]);
    store.remove(&records[0]);
    store.remove(&records[1]);

    store.sync();
    proxy.fail("locked");
    assert_eq!(store.removed_records().len(), 2);

    store.sync();
    proxy.succeed(Vec::new());
    assert!(store.removed_records().is_empty());
}

#[test]
fn failed_update_is_not_rolled_back() {
    let (store, proxy) = scripted(StoreConfig::default());
    let record = persisted(&store, &[1]).remove(0);
    record.set("title", "edited");
    let outcome = Arc::new(Mutex::new(None));
    let o = Arc::clone(&outcome);

    store.update(OperationOptions::default().callback(move |_, records, _, success| {
        *o.lock() = Some((records.len(), success));
    }));
    proxy.fail("conflict");

    assert!(record.is_dirty());
    assert_eq!(record.get("title"), Some(json!("edited")));
    assert_eq!(*outcome.lock(), Some((1, false)));
}

#[test]
fn update_matches_returned_rows_by_id() {
    let (store, proxy) = scripted(StoreConfig::default());
    let records = persisted(&store, &[1, 2]);
    records[0].set("done", true);
    records[1].set("done", true);

    store.update(OperationOptions::default());
    proxy.succeed(vec![
        fields(json!({"id": 2, "title": "second"})),
        fields(json!({"id": 1, "title": "first"})),
    ]);

    assert_eq!(records[0].get("title"), Some(json!("first")));
    assert_eq!(records[1].get("title"), Some(json!("second")));
    assert!(records.iter().all(|r| !r.is_dirty()));
}

#[test]
fn caller_records_are_not_overwritten() {
    let (store, proxy) = scripted(StoreConfig::default());
    let records = persisted(&store, &[1, 2]);
    records[0].set("done", true);
    records[1].set("done", true);

    store.update(OperationOptions::default().records(vec![records[1].clone()]));
    proxy.succeed(Vec::new());

    assert!(records[0].is_dirty());
    assert!(!records[1].is_dirty());
}

#[test]
fn batch_exception_reaches_handler() {
    let (store, proxy) = scripted(StoreConfig::default());
    let record = persisted(&store, &[1]).remove(0);
    record.set("title", "x");
    let failures = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::clone(&failures);
    store.set_batch_exception_handler(move |_, _, op| {
        f.lock().push(op.error().unwrap_or_default().to_string());
    });

    let batch = store.sync().unwrap();
    proxy.fail("conflict");

    assert_eq!(*failures.lock(), vec!["conflict"]);
    assert!(batch.has_exception());
    assert!(batch.is_complete());
    assert!(record.is_dirty());
}

#[test]
fn paused_batch_can_be_retried() {
    let (store, proxy) = scripted(StoreConfig::new().with_pause_on_exception(true));
    let records = persisted(&store, &[1, 2]);
    records[0].set("title", "x");
    store.remove(&records[1]);

    let batch = store.sync().unwrap();
    proxy.fail("busy");
    assert!(batch.is_paused());
    assert_eq!(proxy.calls(), 0);

    batch.retry();
    assert_eq!(proxy.succeed(Vec::new()), Action::Update);
    assert_eq!(proxy.succeed(Vec::new()), Action::Destroy);

    assert!(batch.is_complete());
    assert!(!records[0].is_dirty());
    assert!(store.removed_records().is_empty());
}

#[test]
fn auto_sync_after_add_and_remove() {
    let (store, proxy) = scripted(StoreConfig::new().with_auto_sync(true));

    store.add(vec![Record::new(store.model().clone(), fields(json!({"title": "a"})))]);
    assert_eq!(proxy.batches(), 1);
    proxy.succeed(vec![fields(json!({"id": 1}))]);

    let record = store.get_at(0).unwrap();
    store.remove(&record);
    assert_eq!(proxy.batches(), 2);
    assert_eq!(proxy.pending_actions(), vec![Action::Destroy]);
}

// ============================================================================
// Re-entrancy
// ============================================================================

#[test]
fn listener_may_sync_during_datachanged() {
    let model = model();
    let proxy = Arc::new(MemoryProxy::with_data(
        Arc::clone(&model),
        vec![fields(json!({"id": 1, "title": "a"}))],
    ));
    let store = Store::new(model, proxy.clone(), StoreConfig::default());
    let nested = Arc::new(AtomicUsize::new(0));
    let n = Arc::clone(&nested);
    store.on(EventName::DataChanged, move |store, _| {
        n.fetch_add(1, Ordering::SeqCst);
        store.sync();
        assert!(store.count() <= 2);
    });

    store.load(OperationOptions::default());
    let record = store.get_at(0).unwrap();
    record.set("title", "b");
    store.add(vec![Record::new(store.model().clone(), fields(json!({"title": "c"})))]);
    store.sync();

    assert!(!record.is_dirty());
    assert_eq!(proxy.len(), 2);
    assert!(nested.load(Ordering::SeqCst) >= 2);
}

#[test]
fn callback_may_issue_new_operation() {
    let (store, proxy) = scripted(StoreConfig::default());
    store.load(OperationOptions::default().callback(|store, _, _, _| {
        store.load(OperationOptions::default().add_records(true));
    }));

    proxy.succeed(vec![fields(json!({"id": 1, "title": "a"}))]);
    assert_eq!(proxy.pending_actions(), vec![Action::Read]);

    proxy.succeed(vec![fields(json!({"id": 2, "title": "b"}))]);
    assert_eq!(store.count(), 2);
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn registry_built_store_is_registered() {
    let registry = Registry::new().with_model(Model::new("Note", vec![]));
    let config = StoreConfig::from_json(r#"{"storeId": "scenario-notes", "model": "Note"}"#).unwrap();

    let store = registry.create_store(config).unwrap();

    assert!(StoreManager::lookup("scenario-notes").unwrap().ptr_eq(&store));
    store.destroy_store();
    assert!(StoreManager::lookup("scenario-notes").is_none());
}

#[test]
fn auto_load_with_options_pages_first_read() {
    let registry = Registry::new().with_model(Model::new("Note", vec![]));
    let config = StoreConfig::from_json(
        r#"{
            "model": "Note",
            "autoLoad": {"start": 1, "limit": 2},
            "proxy": {"type": "memory", "data": [{"n": 1}, {"n": 2}, {"n": 3}, {"n": 4}]}
        }"#,
    )
    .unwrap();

    let store = registry.create_store(config).unwrap();

    let ns: Vec<Value> = store.records().iter().filter_map(|r| r.get("n")).collect();
    assert_eq!(ns, vec![json!(2), json!(3)]);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn sync_partitions_records(specs in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>()), 0..12)) {
        let (store, proxy) = scripted(StoreConfig::default());
        for (i, (has_id, edited, valid)) in specs.iter().enumerate() {
            let mut data = Fields::new();
            if *has_id {
                data.insert("id".into(), json!(i));
            }
            if *valid {
                data.insert("title".into(), json!("t"));
            }
            let record = Record::new(store.model().clone(), data);
            store.add(vec![record.clone()]);
            if *edited {
                record.set("done", true);
            }
        }
        let seen = capture_sync_options(&store);

        let expected_create = specs.iter().filter(|(id, _, valid)| !id && *valid).count();
        let expected_update = specs.iter().filter(|(id, edited, valid)| *id && *edited && *valid).count();

        let batch = store.sync();

        if expected_create + expected_update == 0 {
            prop_assert!(batch.is_none());
            prop_assert_eq!(proxy.batches(), 0);
        } else {
            prop_assert_eq!(*seen.lock(), Some((expected_create, expected_update, 0)));
        }
    }
}
