//! Store and proxy configuration.
//!
//! Configuration is plain serde data with camelCase keys, so a store can be
//! described in JSON and built through a [`Registry`](crate::Registry).

use crate::{
    error::Result, FieldDef, Fields, FilterConfig, ModelName, OperationOptions, Sorter, StoreId,
};
use serde::{Deserialize, Serialize};

/// Names a proxy type plus the parameters handed to its factory.
///
/// Deserializes from either `"memory"` or `{"type": "memory", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProxyConfigRepr")]
pub struct ProxyConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub params: Fields,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProxyConfigRepr {
    Kind(String),
    Full {
        #[serde(rename = "type")]
        kind: String,
        #[serde(flatten)]
        params: Fields,
    },
}

impl From<ProxyConfigRepr> for ProxyConfig {
    fn from(repr: ProxyConfigRepr) -> Self {
        match repr {
            ProxyConfigRepr::Kind(kind) => ProxyConfig::new(kind),
            ProxyConfigRepr::Full { kind, params } => ProxyConfig { kind, params },
        }
    }
}

impl ProxyConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Fields::new(),
        }
    }

    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for ProxyConfig {
    fn from(kind: &str) -> Self {
        ProxyConfig::new(kind)
    }
}

/// Whether, and how, a store loads right after construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AutoLoad {
    Enabled(bool),
    /// Load with these options
    Options(OperationOptions),
}

impl Default for AutoLoad {
    fn default() -> Self {
        AutoLoad::Enabled(false)
    }
}

/// How a store reconciles the results of a sync batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchUpdateMode {
    /// Reconcile each operation as it completes
    #[default]
    Operation,
    /// Reconcile everything once the batch completes, with one `datachanged`
    Complete,
}

fn default_store_type() -> String {
    "store".to_string()
}

fn default_true() -> bool {
    true
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Registers the store with the [`StoreManager`](crate::StoreManager) when set
    #[serde(default)]
    pub store_id: Option<StoreId>,
    /// Store type tag resolved by the registry
    #[serde(default = "default_store_type", rename = "type")]
    pub kind: String,
    /// Registered model name
    #[serde(default)]
    pub model: Option<ModelName>,
    /// Fields of an implicit model, used when `model` is absent
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub remote_sort: bool,
    #[serde(default)]
    pub remote_filter: bool,
    #[serde(default)]
    pub auto_load: AutoLoad,
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default)]
    pub batch_update_mode: BatchUpdateMode,
    /// Pause sync batches after a failed operation until retried or resumed
    #[serde(default)]
    pub pause_on_exception: bool,
    #[serde(default = "default_true")]
    pub filter_on_load: bool,
    #[serde(default = "default_true")]
    pub sort_on_load: bool,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    #[serde(default)]
    pub sorters: Vec<Sorter>,
    /// Values merged into the data of every record built by `create`
    #[serde(default)]
    pub model_defaults: Fields,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_id: None,
            kind: default_store_type(),
            model: None,
            fields: Vec::new(),
            proxy: None,
            remote_sort: false,
            remote_filter: false,
            auto_load: AutoLoad::default(),
            auto_sync: false,
            batch_update_mode: BatchUpdateMode::default(),
            pause_on_exception: false,
            filter_on_load: true,
            sort_on_load: true,
            filters: Vec::new(),
            sorters: Vec::new(),
            model_defaults: Fields::new(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_store_id(mut self, id: impl Into<StoreId>) -> Self {
        self.store_id = Some(id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<ModelName>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<ProxyConfig>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_remote_sort(mut self, remote: bool) -> Self {
        self.remote_sort = remote;
        self
    }

    pub fn with_remote_filter(mut self, remote: bool) -> Self {
        self.remote_filter = remote;
        self
    }

    pub fn with_auto_load(mut self, auto_load: AutoLoad) -> Self {
        self.auto_load = auto_load;
        self
    }

    pub fn with_auto_sync(mut self, auto_sync: bool) -> Self {
        self.auto_sync = auto_sync;
        self
    }

    pub fn with_batch_update_mode(mut self, mode: BatchUpdateMode) -> Self {
        self.batch_update_mode = mode;
        self
    }

    pub fn with_pause_on_exception(mut self, pause: bool) -> Self {
        self.pause_on_exception = pause;
        self
    }

    pub fn with_filters(mut self, filters: Vec<FilterConfig>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sorters(mut self, sorters: Vec<Sorter>) -> Self {
        self.sorters = sorters;
        self
    }

    pub fn with_model_defaults(mut self, defaults: Fields) -> Self {
        self.model_defaults = defaults;
        self
    }
}
