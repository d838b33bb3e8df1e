//! Filter descriptors and their normalization.
//!
//! Stores accept filters in several loose shapes: a ready [`Filter`], a bare
//! predicate, or a [`FilterConfig`] (possibly deserialized from JSON, possibly
//! using the legacy `fn` key). [`decode_filters`] turns any of them into a
//! sequence of normalized filters once, when they are assigned.

use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Root segment filters and sorters read values from unless told otherwise.
pub const DEFAULT_ROOT: &str = "data";

/// Predicate deciding whether a record passes a filter.
pub type Predicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// A normalized filter.
#[derive(Clone)]
pub struct Filter {
    id: Option<String>,
    property: Option<String>,
    value: Option<Value>,
    root: String,
    any_match: bool,
    exact_match: bool,
    case_sensitive: bool,
    predicate: Option<Predicate>,
}

impl Filter {
    /// Filter records whose `property` matches `value`.
    pub fn new(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::from_config(FilterConfig::new(property, value))
    }

    /// Filter records with an arbitrary predicate.
    pub fn from_fn(predicate: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        Self::from_predicate(Arc::new(predicate))
    }

    /// Filter records with a shared predicate.
    pub fn from_predicate(predicate: Predicate) -> Self {
        Self::from_config(FilterConfig {
            filter_fn: Some(predicate),
            ..FilterConfig::default()
        })
    }

    fn from_config(config: FilterConfig) -> Self {
        Self {
            id: config.id,
            property: config.property,
            value: config.value,
            root: config.root.unwrap_or_else(|| DEFAULT_ROOT.to_string()),
            any_match: config.any_match,
            exact_match: config.exact_match,
            case_sensitive: config.case_sensitive,
            predicate: config.filter_fn,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    /// Whether `record` passes this filter.
    ///
    /// A filter with neither a predicate nor a property/value pair passes
    /// everything. String values match as a case-insensitive prefix unless
    /// `any_match`, `exact_match` or `case_sensitive` say otherwise; other
    /// values must be equal.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(predicate) = &self.predicate {
            return predicate(record);
        }
        let (Some(property), Some(expected)) = (&self.property, &self.value) else {
            return true;
        };

        let actual = self.lookup(record, property);
        match expected {
            Value::String(pattern) => {
                let actual = match actual {
                    Some(Value::String(s)) => s,
                    None | Some(Value::Null) => return false,
                    Some(other) => other.to_string(),
                };
                self.match_text(&actual, pattern)
            }
            other => actual.as_ref() == Some(other),
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

    fn match_text(&self, actual: &str, pattern: &str) -> bool {
        let (actual, pattern) = if self.case_sensitive {
            (actual.to_string(), pattern.to_string())
        } else {
            (actual.to_lowercase(), pattern.to_lowercase())
        };

        if self.exact_match {
            actual == pattern
        } else if self.any_match {
            actual.contains(&pattern)
        } else {
            actual.starts_with(&pattern)
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        let same_predicate = match (&self.predicate, &other.predicate) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_predicate
            && self.id == other.id
            && self.property == other.property
            && self.value == other.value
            && self.root == other.root
            && self.any_match == other.any_match
            && self.exact_match == other.exact_match
            && self.case_sensitive == other.case_sensitive
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("id", &self.id)
            .field("property", &self.property)
            .field("value", &self.value)
            .field("root", &self.root)
            .field("any_match", &self.any_match)
            .field("exact_match", &self.exact_match)
            .field("case_sensitive", &self.case_sensitive)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Loose filter definition, as found in configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub any_match: bool,
    pub exact_match: bool,
    pub case_sensitive: bool,
    /// Canonical predicate key
    #[serde(skip)]
    pub filter_fn: Option<Predicate>,
    /// Legacy predicate key, renamed to `filter_fn` on normalization
    #[serde(skip)]
    pub legacy_fn: Option<Predicate>,
}

impl FilterConfig {
    pub fn new(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            property: Some(property.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn any_match(mut self) -> Self {
        self.any_match = true;
        self
    }

    pub fn exact_match(mut self) -> Self {
        self.exact_match = true;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}

impl std::fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterConfig")
            .field("id", &self.id)
            .field("property", &self.property)
            .field("value", &self.value)
            .field("root", &self.root)
            .field("filter_fn", &self.filter_fn.as_ref().map(|_| "<fn>"))
            .field("legacy_fn", &self.legacy_fn.as_ref().map(|_| "<fn>"))
            .finish_non_exhaustive()
    }
}

/// One filter-like value.
#[derive(Clone)]
pub enum FilterInput {
    Filter(Filter),
    Predicate(Predicate),
    Config(FilterConfig),
}

impl std::fmt::Debug for FilterInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterInput::Filter(filter) => f.debug_tuple("Filter").field(filter).finish(),
            FilterInput::Predicate(_) => f.write_str("Predicate(<fn>)"),
            FilterInput::Config(config) => f.debug_tuple("Config").field(config).finish(),
        }
    }
}

impl From<Filter> for FilterInput {
    fn from(filter: Filter) -> Self {
        FilterInput::Filter(filter)
    }
}

impl From<FilterConfig> for FilterInput {
    fn from(config: FilterConfig) -> Self {
        FilterInput::Config(config)
    }
}

impl From<Predicate> for FilterInput {
    fn from(predicate: Predicate) -> Self {
        FilterInput::Predicate(predicate)
    }
}

/// Absent, single or many filter-like values.
#[derive(Clone, Debug, Default)]
pub enum FilterSpec {
    #[default]
    Absent,
    One(FilterInput),
    Many(Vec<FilterInput>),
}

macro_rules! filter_spec_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FilterSpec {
                fn from(input: $ty) -> Self {
                    FilterSpec::One(input.into())
                }
            }

            impl From<Vec<$ty>> for FilterSpec {
                fn from(inputs: Vec<$ty>) -> Self {
                    FilterSpec::Many(inputs.into_iter().map(Into::into).collect())
                }
            }

            impl From<Option<$ty>> for FilterSpec {
                fn from(input: Option<$ty>) -> Self {
                    input.map_or(FilterSpec::Absent, |i| FilterSpec::One(i.into()))
                }
            }
        )*
    };
}

filter_spec_from!(Filter, FilterConfig, Predicate, FilterInput);

/// Normalize filter-like input into filters, keeping length and order.
pub fn decode_filters(spec: impl Into<FilterSpec>) -> Vec<Filter> {
    match spec.into() {
        FilterSpec::Absent => Vec::new(),
        FilterSpec::One(input) => vec![normalize(input)],
        FilterSpec::Many(inputs) => inputs.into_iter().map(normalize).collect(),
    }
}

fn normalize(input: FilterInput) -> Filter {
    match input {
        FilterInput::Filter(filter) => filter,
        FilterInput::Predicate(predicate) => Filter::from_predicate(predicate),
        FilterInput::Config(mut config) => {
            if config.root.is_none() {
                config.root = Some(DEFAULT_ROOT.to_string());
            }
            if let Some(legacy) = config.legacy_fn.take() {
                config.filter_fn = Some(legacy);
            }
            Filter::from_config(config)
        }
    }
}
