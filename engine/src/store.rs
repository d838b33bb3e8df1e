//! Store - the record-synchronization core.
//!
//! A [`Store`] holds an ordered working set of records plus a cache of
//! removed records awaiting destruction, builds operations from them, hands
//! those to its proxy and reconciles record state when the proxy answers.
//!
//! Stores are cheap handles. No store lock is held while the proxy, a
//! listener or a callback runs, so any of them may call back into the store.

use crate::{
    decode_filters, error::Result, manager::StoreManager, sorter::SortState, Action, AutoLoad,
    Batch, BatchListeners, BatchOptions, BatchUpdateMode, Comparator, Control, EditKind,
    EventName, Fields, Filter, FilterSpec, ListenerId, Model, Notifier, Operation, OperationId,
    OperationOptions, Proxy, Record, Registry, Sorter, StoreConfig, StoreEvent, StoreId,
};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::sync::{Arc, Weak};

/// Application hook for failed batch operations.
pub type BatchExceptionHandler = Arc<dyn Fn(&Store, &Batch, &Operation) + Send + Sync>;

#[derive(Debug, Clone)]
struct StoreSettings {
    remote_sort: bool,
    remote_filter: bool,
    auto_sync: bool,
    batch_update_mode: BatchUpdateMode,
    pause_on_exception: bool,
    filter_on_load: bool,
    sort_on_load: bool,
    model_defaults: Fields,
}

#[derive(Debug, Default)]
struct StoreState {
    data: Vec<Record>,
    /// Unfiltered working set while local filters are applied
    snapshot: Option<Vec<Record>>,
    /// Removed records not yet confirmed destroyed
    removed: Vec<Record>,
    filters: Vec<Filter>,
    sort: SortState,
    loading: bool,
    destroyed: bool,
}

impl StoreState {
    /// Empty the working set and drop the filter snapshot, returning every
    /// record either held, including those a local filter hid.
    fn take_all(&mut self) -> Vec<Record> {
        let visible = std::mem::take(&mut self.data);
        match self.snapshot.take() {
            Some(mut all) => {
                for record in visible {
                    if !all.iter().any(|r| r.ptr_eq(&record)) {
                        all.push(record);
                    }
                }
                all
            }
            None => visible,
        }
    }
}

pub(crate) struct StoreInner {
    id: Option<StoreId>,
    model: Arc<Model>,
    proxy: Arc<dyn Proxy>,
    settings: StoreSettings,
    notifier: Notifier,
    state: Mutex<StoreState>,
    exception_handler: Mutex<Option<BatchExceptionHandler>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Some(id) = &self.id {
            StoreManager::prune(id);
        }
    }
}

/// A working set of records synchronized with a proxy.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

/// Non-owning link to a store, held by records and pending completions.
#[derive(Clone)]
pub(crate) struct WeakStore(Weak<StoreInner>);

impl WeakStore {
    pub(crate) fn upgrade(&self) -> Option<Store> {
        self.0.upgrade().map(|inner| Store { inner })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub(crate) fn points_to(&self, store: &Store) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&store.inner))
    }
}

impl std::fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(store) => write!(f, "WeakStore({:?})", store.store_id()),
            None => f.write_str("WeakStore(<dropped>)"),
        }
    }
}

impl Store {
    /// Create a store of `model` backed by `proxy`.
    ///
    /// `config.model`, `config.fields` and `config.proxy` are not consulted;
    /// use [`Store::from_config`] to resolve them through a registry.
    pub fn new(model: Arc<Model>, proxy: Arc<dyn Proxy>, config: StoreConfig) -> Self {
        let StoreConfig {
            store_id,
            remote_sort,
            remote_filter,
            auto_load,
            auto_sync,
            batch_update_mode,
            pause_on_exception,
            filter_on_load,
            sort_on_load,
            filters,
            sorters,
            model_defaults,
            ..
        } = config;

        let store = Self {
            inner: Arc::new(StoreInner {
                id: store_id,
                model,
                proxy,
                settings: StoreSettings {
                    remote_sort,
                    remote_filter,
                    auto_sync,
                    batch_update_mode,
                    pause_on_exception,
                    filter_on_load,
                    sort_on_load,
                    model_defaults,
                },
                notifier: Notifier::new(),
                state: Mutex::new(StoreState {
                    filters: decode_filters(filters),
                    sort: SortState::new(sorters),
                    ..StoreState::default()
                }),
                exception_handler: Mutex::new(None),
            }),
        };

        StoreManager::register(&store);

        match auto_load {
            AutoLoad::Enabled(true) => {
                store.load(OperationOptions::default());
            }
            AutoLoad::Options(options) => {
                store.load(options);
            }
            AutoLoad::Enabled(false) => {}
        }
        store
    }

    /// Create a store, resolving its model and proxy through `registry`.
    pub fn from_config(registry: &Registry, config: StoreConfig) -> Result<Self> {
        let model = registry.model_for(&config)?;
        let proxy = registry.proxy_for(&config, &model)?;
        Ok(Self::new(model, proxy, config))
    }

    pub fn store_id(&self) -> Option<&StoreId> {
        self.inner.id.as_ref()
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.inner.model
    }

    pub fn proxy(&self) -> &Arc<dyn Proxy> {
        &self.inner.proxy
    }

    pub fn batch_update_mode(&self) -> BatchUpdateMode {
        self.inner.settings.batch_update_mode
    }

    pub fn is_auto_sync(&self) -> bool {
        self.inner.settings.auto_sync
    }

    /// Whether two handles refer to the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakStore {
        WeakStore(Arc::downgrade(&self.inner))
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.state.lock()
    }

    // events

    /// Subscribe to `event`. Listeners of cancellable events veto by
    /// returning `false` or [`Control::Stop`].
    pub fn on<F, R>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&Store, &StoreEvent<'_>) -> R + Send + Sync + 'static,
        R: Into<Control>,
    {
        self.inner.notifier.on(event, listener)
    }

    pub fn off(&self, id: ListenerId) {
        self.inner.notifier.off(id);
    }

    pub fn suspend_events(&self) {
        self.inner.notifier.suspend_events();
    }

    pub fn resume_events(&self) {
        self.inner.notifier.resume_events();
    }

    pub fn suspend_event(&self, event: EventName) {
        self.inner.notifier.suspend_event(event);
    }

    pub fn resume_event(&self, event: EventName) {
        self.inner.notifier.resume_event(event);
    }

    pub fn clear_listeners(&self) {
        self.inner.notifier.clear_listeners();
    }

    fn fire(&self, event: StoreEvent<'_>) {
        self.inner.notifier.fire(self, &event);
    }

    fn fire_cancellable(&self, event: StoreEvent<'_>) -> bool {
        self.inner.notifier.fire_cancellable(self, &event)
    }

    /// Install the hook run for every failed operation of a sync batch.
    pub fn set_batch_exception_handler(
        &self,
        handler: impl Fn(&Store, &Batch, &Operation) + Send + Sync + 'static,
    ) {
        *self.inner.exception_handler.lock() = Some(Arc::new(handler));
    }

    // working set

    /// Number of records in the working set.
    pub fn count(&self) -> usize {
        self.state().data.len()
    }

    pub fn get_at(&self, index: usize) -> Option<Record> {
        self.state().data.get(index).cloned()
    }

    /// Find a record by its backend identity.
    pub fn get_by_id(&self, id: &Value) -> Option<Record> {
        self.records()
            .into_iter()
            .find(|r| r.id().as_ref() == Some(id))
    }

    pub fn index_of(&self, record: &Record) -> Option<usize> {
        self.state().data.iter().position(|r| r.ptr_eq(record))
    }

    /// Snapshot of the working set.
    pub fn records(&self) -> Vec<Record> {
        self.state().data.clone()
    }

    /// Index of the first record matching `predicate`.
    pub fn find_by(&self, predicate: impl Fn(&Record) -> bool) -> Option<usize> {
        self.records().iter().position(predicate)
    }

    /// Phantom records that pass validation.
    pub fn new_records(&self) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|r| r.is_phantom() && r.is_valid())
            .collect()
    }

    /// Modified, persisted records that pass validation.
    pub fn updated_records(&self) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|r| r.is_dirty() && !r.is_phantom() && r.is_valid())
            .collect()
    }

    /// Removed records not yet confirmed destroyed.
    pub fn removed_records(&self) -> Vec<Record> {
        self.state().removed.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn is_filtered(&self) -> bool {
        !self.state().filters.is_empty()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }

    /// Append records and return the index of the first.
    pub fn add(&self, records: Vec<Record>) -> usize {
        let index = self.count();
        self.insert(index, records)
    }

    /// Build records of the store's model from `rows` and append them.
    pub fn add_data(&self, rows: Vec<Fields>) -> Vec<Record> {
        let records: Vec<Record> = rows
            .into_iter()
            .map(|row| Record::new(Arc::clone(&self.inner.model), row))
            .collect();
        self.add(records.clone());
        records
    }

    /// Insert records at `index` (clamped to the end), returning the index used.
    pub fn insert(&self, index: usize, records: Vec<Record>) -> usize {
        let index = self.splice(index, &records);
        if self.inner.settings.auto_sync && !records.is_empty() {
            self.sync();
        }
        index
    }

    fn splice(&self, index: usize, records: &[Record]) -> usize {
        if records.is_empty() {
            return index;
        }
        for record in records {
            record.join(self);
        }
        let index = {
            let mut state = self.state();
            let index = index.min(state.data.len());
            state.data.splice(index..index, records.iter().cloned());
            if let Some(snapshot) = state.snapshot.as_mut() {
                snapshot.extend(records.iter().cloned());
            }
            index
        };
        self.fire(StoreEvent::Add { records, index });
        index
    }

    /// Take `record` out of the working set. Persisted records move to the
    /// removed cache for the next sync; phantom records are dropped.
    pub fn remove(&self, record: &Record) -> bool {
        let index = {
            let mut state = self.state();
            let Some(index) = state.data.iter().position(|r| r.ptr_eq(record)) else {
                return false;
            };
            state.data.remove(index);
            if let Some(snapshot) = state.snapshot.as_mut() {
                snapshot.retain(|r| !r.ptr_eq(record));
            }
            if !record.is_phantom() {
                state.removed.push(record.clone());
            }
            index
        };

        record.unjoin(self);
        self.fire(StoreEvent::Remove { record, index });

        if self.inner.settings.auto_sync {
            self.sync();
        }
        true
    }

    pub fn remove_at(&self, index: usize) -> Option<Record> {
        let record = self.get_at(index)?;
        self.remove(&record);
        Some(record)
    }

    /// Empty the working set. The removed cache is left alone.
    pub fn remove_all(&self, silent: bool) {
        let records = {
            let mut state = self.state();
            state.take_all()
        };
        for record in &records {
            record.unjoin(self);
        }
        if !silent {
            self.fire(StoreEvent::Clear);
        }
    }

    // operations

    /// Build a record from `data` and persist it with a create operation.
    ///
    /// The record joins the working set immediately and stays phantom until
    /// the create succeeds.
    pub fn create(&self, mut data: Fields, options: OperationOptions) -> Record {
        for (field, value) in &self.inner.settings.model_defaults {
            data.entry(field.clone()).or_insert_with(|| value.clone());
        }
        let record = Record::new(Arc::clone(&self.inner.model), data);
        let index = self.count();
        self.splice(index, std::slice::from_ref(&record));

        let defaults = OperationOptions::new(Action::Create).records(vec![record.clone()]);
        self.submit_write(options.merge_if_absent(defaults));
        record
    }

    /// Persist the modified records with an update operation.
    pub fn update(&self, options: OperationOptions) -> OperationId {
        let defaults = OperationOptions::new(Action::Update).records(self.updated_records());
        self.submit_write(options.merge_if_absent(defaults))
    }

    /// Destroy the removed records with a destroy operation.
    pub fn destroy(&self, options: OperationOptions) -> OperationId {
        let defaults = OperationOptions::new(Action::Destroy).records(self.removed_records());
        self.submit_write(options.merge_if_absent(defaults))
    }

    fn submit_write(&self, options: OperationOptions) -> OperationId {
        let mut operation = Operation::from_options(options);
        operation.set_started();
        let id = operation.id().clone();
        tracing::debug!(
            store_id = ?self.inner.id,
            action = %operation.action(),
            records = operation.records().len(),
            "issuing operation"
        );

        let store = self.downgrade();
        self.inner.proxy.execute(
            operation,
            Box::new(move |operation| match store.upgrade() {
                Some(store) => store.on_proxy_write(operation),
                None => tracing::debug!(id = %operation.id(), "store dropped before completion"),
            }),
        );
        id
    }

    /// Load records through the proxy with the active filters and sorters.
    ///
    /// Returns `None` when a `beforeload` listener vetoed.
    pub fn load(&self, options: OperationOptions) -> Option<OperationId> {
        let (filters, sorters) = {
            let state = self.state();
            (state.filters.clone(), state.sort.sorters().to_vec())
        };
        let mut options = options.merge_if_absent(
            OperationOptions::new(Action::Read)
                .filters(filters)
                .sorters(sorters),
        );
        options.action = Some(Action::Read);
        let mut operation = Operation::from_options(options);

        if !self.fire_cancellable(StoreEvent::BeforeLoad {
            operation: &operation,
        }) {
            tracing::debug!(store_id = ?self.inner.id, "load vetoed");
            return None;
        }

        self.state().loading = true;
        operation.set_started();
        let id = operation.id().clone();
        tracing::debug!(store_id = ?self.inner.id, "issuing read");

        let store = self.downgrade();
        self.inner.proxy.read(
            operation,
            Box::new(move |operation| match store.upgrade() {
                Some(store) => store.on_proxy_load(operation),
                None => tracing::debug!(id = %operation.id(), "store dropped before load completed"),
            }),
        );
        Some(id)
    }

    /// Alias for [`Store::load`].
    pub fn read(&self, options: OperationOptions) -> Option<OperationId> {
        self.load(options)
    }

    /// Send every pending change to the proxy as one batch.
    ///
    /// Returns `None` when there is nothing to send or a `beforesync`
    /// listener vetoed.
    pub fn sync(&self) -> Option<Batch> {
        let removed = self.removed_records();
        let mut options =
            BatchOptions::from_sets(self.new_records(), self.updated_records(), removed);
        if options.is_empty() {
            return None;
        }
        options.pause_on_exception = self.inner.settings.pause_on_exception;

        if !self.fire_cancellable(StoreEvent::BeforeSync { options: &options }) {
            tracing::debug!(store_id = ?self.inner.id, "sync vetoed");
            return None;
        }

        tracing::debug!(store_id = ?self.inner.id, ?options, "issuing batch");
        let listeners = self.batch_listeners();
        Some(Arc::clone(&self.inner.proxy).batch(options, listeners))
    }

    fn batch_listeners(&self) -> BatchListeners {
        let store = self.downgrade();
        let on_exception = {
            let store = store.clone();
            move |batch: &Batch, operation: &Operation| {
                if let Some(store) = store.upgrade() {
                    store.on_batch_exception(batch, operation);
                }
            }
        };
        let listeners = BatchListeners::new().on_exception(on_exception);

        match self.inner.settings.batch_update_mode {
            BatchUpdateMode::Operation => listeners.on_operation_complete(move |_, operation| {
                if let Some(store) = store.upgrade() {
                    store.on_proxy_write(operation.clone());
                }
            }),
            BatchUpdateMode::Complete => listeners.on_complete(move |batch, _| {
                if let Some(store) = store.upgrade() {
                    store.on_batch_complete(batch);
                }
            }),
        }
    }

    fn on_batch_complete(&self, batch: &Batch) {
        self.suspend_event(EventName::DataChanged);
        for operation in batch.operations() {
            self.on_proxy_write(operation);
        }
        self.resume_event(EventName::DataChanged);
        self.fire(StoreEvent::DataChanged);
    }

    fn on_batch_exception(&self, batch: &Batch, operation: &Operation) {
        tracing::warn!(
            store_id = ?self.inner.id,
            action = %operation.action(),
            error = operation.error().unwrap_or_default(),
            "batch operation failed"
        );
        let handler = self.inner.exception_handler.lock().clone();
        if let Some(handler) = handler {
            handler(self, batch, operation);
        }
    }

    // reconciliation

    /// Reconcile a completed create, update or destroy operation.
    pub fn on_proxy_write(&self, operation: Operation) {
        let success = operation.was_successful();
        if success {
            match operation.action() {
                Action::Create => self.on_create_records(&operation),
                Action::Update => self.on_update_records(&operation),
                Action::Destroy => self.on_destroy_records(&operation),
                Action::Read => {}
            }
            self.fire(StoreEvent::Write {
                operation: &operation,
            });
            self.fire(StoreEvent::DataChanged);
        } else {
            tracing::warn!(
                store_id = ?self.inner.id,
                action = %operation.action(),
                error = operation.error().unwrap_or_default(),
                "operation failed"
            );
        }

        if let Some(callback) = operation.callback() {
            callback(self, operation.records(), &operation, success);
        }
    }

    fn on_create_records(&self, operation: &Operation) {
        let returned = operation.result_records();
        for (i, record) in operation.records().iter().enumerate() {
            record.accept_server_data(returned.get(i));
        }
    }

    fn on_update_records(&self, operation: &Operation) {
        let returned = operation.result_records();
        let id_property = &self.inner.model.id_property;
        for (i, record) in operation.records().iter().enumerate() {
            let by_id = record
                .id()
                .and_then(|id| returned.iter().find(|row| row.get(id_property) == Some(&id)));
            record.accept_server_data(by_id.or_else(|| returned.get(i)));
        }
    }

    fn on_destroy_records(&self, operation: &Operation) {
        let destroyed = operation.records();
        self.state()
            .removed
            .retain(|r| !destroyed.iter().any(|d| d.ptr_eq(r)));
    }

    /// Reconcile a completed read operation.
    pub fn on_proxy_load(&self, mut operation: Operation) {
        let records: Vec<Record> = operation
            .result_records()
            .iter()
            .map(|row| Record::new(Arc::clone(&self.inner.model), row.clone()))
            .collect();
        operation.set_records(records.clone());
        let success = operation.was_successful();

        if success {
            self.load_records(&records, operation.add_records());
        } else {
            tracing::warn!(
                store_id = ?self.inner.id,
                error = operation.error().unwrap_or_default(),
                "load failed"
            );
        }

        self.state().loading = false;
        self.fire(StoreEvent::Load {
            records: &records,
            success,
            operation: &operation,
        });
        if let Some(callback) = operation.callback() {
            callback(self, &records, &operation, success);
        }
    }

    fn load_records(&self, records: &[Record], append: bool) {
        for record in records {
            record.join(self);
        }
        let replaced = {
            let mut state = self.state();
            if append {
                state.data.extend(records.iter().cloned());
                if let Some(snapshot) = state.snapshot.as_mut() {
                    snapshot.extend(records.iter().cloned());
                }
                Vec::new()
            } else {
                let replaced = state.take_all();
                state.data = records.to_vec();
                replaced
            }
        };
        for record in replaced
            .iter()
            .filter(|r| !records.iter().any(|n| n.ptr_eq(r)))
        {
            record.unjoin(self);
        }

        let settings = &self.inner.settings;
        self.suspend_events();
        if settings.filter_on_load && !settings.remote_filter && self.is_filtered() {
            self.apply_filters();
        }
        if settings.sort_on_load && !settings.remote_sort {
            let sort = self.state().sort.clone();
            if sort.is_sorted() {
                self.do_sort(sort.comparator());
            }
        }
        self.resume_events();
        self.fire(StoreEvent::DataChanged);
    }

    // filtering

    /// Add filters. Remote filtering reloads; local filtering narrows the
    /// working set.
    pub fn filter(&self, spec: impl Into<FilterSpec>) {
        let filters = decode_filters(spec);
        if filters.is_empty() {
            return;
        }
        self.state().filters.extend(filters);

        if self.inner.settings.remote_filter {
            self.load(OperationOptions::default());
        } else {
            self.apply_filters();
            self.fire(StoreEvent::DataChanged);
        }
    }

    /// Drop every filter, restoring the unfiltered working set.
    pub fn clear_filter(&self, suppress_event: bool) {
        let snapshot = {
            let mut state = self.state();
            state.filters.clear();
            state.snapshot.take()
        };

        if self.inner.settings.remote_filter {
            if !suppress_event {
                self.load(OperationOptions::default());
            }
            return;
        }

        if let Some(snapshot) = snapshot {
            self.state().data = snapshot;
        }
        if !suppress_event {
            self.fire(StoreEvent::DataChanged);
        }
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.state().filters.clone()
    }

    fn apply_filters(&self) {
        let (source, filters) = {
            let state = self.state();
            let source = state.snapshot.clone().unwrap_or_else(|| state.data.clone());
            (source, state.filters.clone())
        };
        let narrowed: Vec<Record> = source
            .iter()
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .cloned()
            .collect();

        let mut state = self.state();
        state.snapshot = Some(source);
        state.data = narrowed;
    }

    // sorting

    /// Replace the sorters and sort.
    pub fn sort(&self, sorters: Vec<Sorter>) {
        let comparator = {
            let mut state = self.state();
            state.sort.set(sorters);
            state.sort.comparator()
        };
        self.do_sort(comparator);
    }

    /// Sort by one property, flipping direction when already sorted by it.
    pub fn sort_by_property(&self, property: &str) {
        let comparator = {
            let mut state = self.state();
            state.sort.toggle(property);
            state.sort.comparator()
        };
        self.do_sort(comparator);
    }

    pub fn sorters(&self) -> Vec<Sorter> {
        self.state().sort.sorters().to_vec()
    }

    /// Order the working set by `comparator`, or reload when sorting is remote.
    pub fn do_sort(&self, comparator: Comparator) {
        if self.inner.settings.remote_sort {
            self.load(OperationOptions::default());
            return;
        }

        let (mut data, mut snapshot) = {
            let state = self.state();
            (state.data.clone(), state.snapshot.clone())
        };
        data.sort_by(|a, b| comparator(a, b));
        if let Some(snapshot) = snapshot.as_mut() {
            snapshot.sort_by(|a, b| comparator(a, b));
        }
        {
            let mut state = self.state();
            state.data = data;
            state.snapshot = snapshot;
        }
        self.fire(StoreEvent::DataChanged);
    }

    // record feedback

    pub(crate) fn after_edit(&self, record: &Record) {
        if self.inner.settings.auto_sync {
            self.sync();
        }
        self.fire(StoreEvent::Update {
            record,
            kind: EditKind::Edit,
        });
    }

    pub(crate) fn after_reject(&self, record: &Record) {
        self.fire(StoreEvent::Update {
            record,
            kind: EditKind::Reject,
        });
    }

    pub(crate) fn after_commit(&self, record: &Record) {
        self.fire(StoreEvent::Update {
            record,
            kind: EditKind::Commit,
        });
    }

    /// Tear the store down: unregister it, release its records and drop
    /// every listener. Calling it again does nothing.
    pub fn destroy_store(&self) {
        let records = {
            let mut state = self.state();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.removed.clear();
            state.take_all()
        };

        StoreManager::unregister(self);
        for record in &records {
            record.unjoin(self);
        }
        self.clear_listeners();
        tracing::debug!(store_id = ?self.inner.id, "store destroyed");
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Store")
            .field("store_id", &self.inner.id)
            .field("model", &self.inner.model.name)
            .field("count", &state.data.len())
            .field("removed", &state.removed.len())
            .field("filters", &state.filters.len())
            .field("sorters", &state.sort.sorters().len())
            .field("loading", &state.loading)
            .finish()
    }
}
