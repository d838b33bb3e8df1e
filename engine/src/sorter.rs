//! Sort descriptors and the sort state a store carries.

use crate::filter::DEFAULT_ROOT;
use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Comparison function over records.
pub type Comparator = Arc<dyn Fn(&Record, &Record) -> Ordering + Send + Sync>;

/// Sort direction for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

fn default_root() -> String {
    DEFAULT_ROOT.to_string()
}

/// A single sort key.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sorter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(skip)]
    pub sorter_fn: Option<Comparator>,
}

impl Sorter {
    /// Sort ascending by `property`.
    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Asc)
    }

    /// Sort descending by `property`.
    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, SortDirection::Desc)
    }

    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: Some(property.into()),
            direction,
            root: default_root(),
            sorter_fn: None,
        }
    }

    /// Sort with a custom comparison, still honouring `direction`.
    pub fn from_fn(
        compare: impl Fn(&Record, &Record) -> Ordering + Send + Sync + 'static,
        direction: SortDirection,
    ) -> Self {
        Self {
            property: None,
            direction,
            root: default_root(),
            sorter_fn: Some(Arc::new(compare)),
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Compare two records by this key.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = match (&self.sorter_fn, &self.property) {
            (Some(compare), _) => compare(a, b),
            (None, Some(property)) => {
                compare_values(&self.lookup(a, property), &self.lookup(b, property))
            }
            (None, None) => Ordering::Equal,
        };

        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    fn lookup(&self, record: &Record, property: &str) -> Option<Value> {
        if self.root == DEFAULT_ROOT {
            record.get(property)
        } else {
            record
                .get(&self.root)
                .and_then(|nested| nested.get(property).cloned())
        }
    }
}

impl PartialEq for Sorter {
    fn eq(&self, other: &Self) -> bool {
        let same_fn = match (&self.sorter_fn, &other.sorter_fn) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_fn
            && self.property == other.property
            && self.direction == other.direction
            && self.root == other.root
    }
}

impl std::fmt::Debug for Sorter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sorter")
            .field("property", &self.property)
            .field("direction", &self.direction)
            .field("root", &self.root)
            .field("sorter_fn", &self.sorter_fn.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl From<&str> for Sorter {
    fn from(property: &str) -> Self {
        Sorter::asc(property)
    }
}

impl From<String> for Sorter {
    fn from(property: String) -> Self {
        Sorter::asc(property)
    }
}

/// Total order over JSON values: missing/null < bool < number < string < other.
fn compare_values(a: &Option<Value>, b: &Option<Value>) -> Ordering {
    fn rank(v: &Option<Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) if rank(a) == 4 && rank(b) == 4 => x.to_string().cmp(&y.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// The sort capability a store delegates to.
#[derive(Debug, Clone, Default)]
pub struct SortState {
    sorters: Vec<Sorter>,
}

impl SortState {
    pub fn new(sorters: Vec<Sorter>) -> Self {
        Self { sorters }
    }

    pub fn sorters(&self) -> &[Sorter] {
        &self.sorters
    }

    pub fn is_sorted(&self) -> bool {
        !self.sorters.is_empty()
    }

    /// Replace the active sorters.
    pub fn set(&mut self, sorters: Vec<Sorter>) {
        self.sorters = sorters;
    }

    /// Sort by a single property, flipping the direction when that property
    /// is already the primary key.
    pub fn toggle(&mut self, property: &str) -> &Sorter {
        let direction = match self.sorters.first() {
            Some(primary) if primary.property.as_deref() == Some(property) => {
                primary.direction.toggle()
            }
            _ => SortDirection::Asc,
        };
        self.sorters = vec![Sorter::new(property, direction)];
        &self.sorters[0]
    }

    /// Comparator applying every sorter in order until one decides.
    pub fn comparator(&self) -> Comparator {
        let sorters = self.sorters.clone();
        Arc::new(move |a: &Record, b: &Record| {
            sorters
                .iter()
                .map(|s| s.compare(a, b))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    }
}
