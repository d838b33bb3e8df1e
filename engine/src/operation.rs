//! Operation types describing requests to the backend.
//!
//! A store builds one [`Operation`] per request, hands it to the proxy, and
//! receives the same operation back once the proxy has marked it complete.

use crate::{error::Result, Error, Fields, Filter, OperationId, Record, Sorter, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Caller completion hook: `(store, records, operation, success)`.
///
/// The store is passed as the default scope; anything else the caller needs
/// is captured by the closure.
pub type OperationCallback = Arc<dyn Fn(&Store, &[Record], &Operation, bool) + Send + Sync>;

/// What an operation asks the backend to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Destroy,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Destroy => write!(f, "destroy"),
        }
    }
}

/// Completion state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Pending,
    Success,
    Failure,
}

/// What the backend returned for an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    /// Records as returned by the backend
    #[serde(default)]
    pub records: Vec<Fields>,
    /// Total available on the backend, before paging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResultSet {
    pub fn new(records: Vec<Fields>) -> Self {
        Self {
            records,
            total: None,
            message: None,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }
}

/// A single request against the backend.
#[derive(Clone)]
pub struct Operation {
    id: OperationId,
    action: Action,
    records: Vec<Record>,
    filters: Vec<Filter>,
    sorters: Vec<Sorter>,
    start: Option<usize>,
    limit: Option<usize>,
    page: Option<usize>,
    params: Fields,
    add_records: bool,
    callback: Option<OperationCallback>,
    started: bool,
    running: bool,
    outcome: Outcome,
    error: Option<String>,
    result_set: Option<ResultSet>,
}

impl Operation {
    /// Create an operation with no records or parameters.
    pub fn new(action: Action) -> Self {
        Self::from_options(OperationOptions::new(action))
    }

    /// Build an operation from fully merged options.
    ///
    /// Options without an action describe a read.
    pub fn from_options(options: OperationOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action: options.action.unwrap_or(Action::Read),
            records: options.records.unwrap_or_default(),
            filters: options.filters.unwrap_or_default(),
            sorters: options.sorters.unwrap_or_default(),
            start: options.start,
            limit: options.limit,
            page: options.page,
            params: options.params.unwrap_or_default(),
            add_records: options.add_records.unwrap_or(false),
            callback: options.callback,
            started: false,
            running: false,
            outcome: Outcome::Pending,
            error: None,
            result_set: None,
        }
    }

    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Records submitted with this operation.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub(crate) fn set_records(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn sorters(&self) -> &[Sorter] {
        &self.sorters
    }

    pub fn start(&self) -> Option<usize> {
        self.start
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn page(&self) -> Option<usize> {
        self.page
    }

    pub fn params(&self) -> &Fields {
        &self.params
    }

    /// Whether a read should append to the working set instead of replacing it.
    pub fn add_records(&self) -> bool {
        self.add_records
    }

    pub fn callback(&self) -> Option<&OperationCallback> {
        self.callback.as_ref()
    }

    /// Mark the operation as handed to the backend.
    pub fn set_started(&mut self) {
        self.started = true;
        self.running = true;
    }

    /// Return a completed operation to pending so it can be issued again.
    pub(crate) fn reset(&mut self) {
        self.started = false;
        self.running = false;
        self.outcome = Outcome::Pending;
        self.error = None;
        self.result_set = None;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_complete(&self) -> bool {
        self.outcome != Outcome::Pending
    }

    pub fn was_successful(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn has_exception(&self) -> bool {
        self.outcome == Outcome::Failure
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Mark the operation as succeeded.
    pub fn set_successful(&mut self) -> Result<()> {
        self.finish(Outcome::Success)
    }

    /// Mark the operation as failed with `error`.
    pub fn set_exception(&mut self, error: impl Into<String>) -> Result<()> {
        self.finish(Outcome::Failure)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Mark the operation as succeeded or failed.
    pub fn complete(&mut self, success: bool) -> Result<()> {
        if success {
            self.set_successful()
        } else {
            self.finish(Outcome::Failure)
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Result<()> {
        if self.is_complete() {
            return Err(Error::OutcomeAlreadySet(self.id.clone()));
        }
        self.outcome = outcome;
        self.running = false;
        Ok(())
    }

    pub fn result_set(&self) -> Option<&ResultSet> {
        self.result_set.as_ref()
    }

    pub fn set_result_set(&mut self, result_set: ResultSet) {
        self.result_set = Some(result_set);
    }

    /// Records the backend returned, if any.
    pub fn result_records(&self) -> &[Fields] {
        self.result_set
            .as_ref()
            .map(|rs| rs.records.as_slice())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.id)
            .field("action", &self.action)
            .field("records", &self.records.len())
            .field("filters", &self.filters)
            .field("sorters", &self.sorters)
            .field("start", &self.start)
            .field("limit", &self.limit)
            .field("outcome", &self.outcome)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Caller-supplied operation parameters.
///
/// Every key is optional; store entry points fill in only what the caller
/// left out (see [`OperationOptions::merge_if_absent`]).
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationOptions {
    pub action: Option<Action>,
    #[serde(skip)]
    pub records: Option<Vec<Record>>,
    #[serde(skip)]
    pub filters: Option<Vec<Filter>>,
    #[serde(skip)]
    pub sorters: Option<Vec<Sorter>>,
    pub start: Option<usize>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub params: Option<Fields>,
    pub add_records: Option<bool>,
    #[serde(skip)]
    pub callback: Option<OperationCallback>,
}

impl OperationOptions {
    pub fn new(action: Action) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    pub fn records(mut self, records: Vec<Record>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn sorters(mut self, sorters: Vec<Sorter>) -> Self {
        self.sorters = Some(sorters);
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params
            .get_or_insert_with(Fields::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn add_records(mut self, add: bool) -> Self {
        self.add_records = Some(add);
        self
    }

    pub fn callback(
        mut self,
        callback: impl Fn(&Store, &[Record], &Operation, bool) + Send + Sync + 'static,
    ) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Fill every key left unset with the value from `defaults`.
    pub fn merge_if_absent(self, defaults: OperationOptions) -> OperationOptions {
        OperationOptions {
            action: self.action.or(defaults.action),
            records: self.records.or(defaults.records),
            filters: self.filters.or(defaults.filters),
            sorters: self.sorters.or(defaults.sorters),
            start: self.start.or(defaults.start),
            limit: self.limit.or(defaults.limit),
            page: self.page.or(defaults.page),
            params: self.params.or(defaults.params),
            add_records: self.add_records.or(defaults.add_records),
            callback: self.callback.or(defaults.callback),
        }
    }
}

impl std::fmt::Debug for OperationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationOptions")
            .field("action", &self.action)
            .field("records", &self.records.as_ref().map(Vec::len))
            .field("filters", &self.filters)
            .field("sorters", &self.sorters)
            .field("start", &self.start)
            .field("limit", &self.limit)
            .field("page", &self.page)
            .field("params", &self.params)
            .field("add_records", &self.add_records)
            .field("callback", &self.callback.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
