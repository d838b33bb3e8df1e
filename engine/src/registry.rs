//! Name-to-constructor lookup for models, proxies and store types.
//!
//! Type tags in configuration are resolved here once, when a store is
//! built. Misconfiguration fails construction instead of surfacing later.

use crate::{
    config::ProxyConfig, error::Result, Error, Fields, MemoryProxy, Model, ModelName, Proxy,
    Store, StoreConfig,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a proxy from its configuration for records of a model.
pub type ProxyFactory =
    Arc<dyn Fn(&ProxyConfig, &Arc<Model>) -> Result<Arc<dyn Proxy>> + Send + Sync>;

/// Builds a store from its configuration.
pub type StoreFactory = Arc<dyn Fn(&Registry, StoreConfig) -> Result<Store> + Send + Sync>;

/// Proxy type used when neither the store nor its model names one.
pub const DEFAULT_PROXY_TYPE: &str = "memory";

/// Store type every registry knows.
pub const DEFAULT_STORE_TYPE: &str = "store";

/// Registered models and constructors keyed by type tag.
#[derive(Clone)]
pub struct Registry {
    models: HashMap<ModelName, Arc<Model>>,
    proxies: HashMap<String, ProxyFactory>,
    stores: HashMap<String, StoreFactory>,
}

impl Registry {
    /// A registry with the `"memory"` proxy and `"store"` store types.
    pub fn new() -> Self {
        let mut registry = Self {
            models: HashMap::new(),
            proxies: HashMap::new(),
            stores: HashMap::new(),
        };
        registry.register_proxy(DEFAULT_PROXY_TYPE, memory_proxy);
        registry.register_store_type(DEFAULT_STORE_TYPE, Store::from_config);
        registry
    }

    /// Register a model under its name, replacing any previous one.
    pub fn register_model(&mut self, model: Model) -> Arc<Model> {
        let model = Arc::new(model);
        self.models.insert(model.name.clone(), Arc::clone(&model));
        model
    }

    /// Builder-style method to register a model.
    pub fn with_model(mut self, model: Model) -> Self {
        self.register_model(model);
        self
    }

    pub fn model(&self, name: &str) -> Option<Arc<Model>> {
        self.models.get(name).cloned()
    }

    pub fn register_proxy(
        &mut self,
        kind: impl Into<String>,
        factory: impl Fn(&ProxyConfig, &Arc<Model>) -> Result<Arc<dyn Proxy>>
            + Send
            + Sync
            + 'static,
    ) {
        self.proxies.insert(kind.into(), Arc::new(factory));
    }

    pub fn register_store_type(
        &mut self,
        kind: impl Into<String>,
        factory: impl Fn(&Registry, StoreConfig) -> Result<Store> + Send + Sync + 'static,
    ) {
        self.stores.insert(kind.into(), Arc::new(factory));
    }

    /// Build a store of the type `config` names.
    pub fn create_store(&self, config: StoreConfig) -> Result<Store> {
        let factory = self
            .stores
            .get(&config.kind)
            .cloned()
            .ok_or_else(|| Error::UnknownStoreType(config.kind.clone()))?;
        factory(self, config)
    }

    /// Build a proxy of the type `config` names.
    pub fn create_proxy(
        &self,
        config: &ProxyConfig,
        model: &Arc<Model>,
    ) -> Result<Arc<dyn Proxy>> {
        let factory = self
            .proxies
            .get(&config.kind)
            .ok_or_else(|| Error::UnknownProxyType(config.kind.clone()))?;
        factory(config, model)
    }

    /// The registered model `config` names, or an implicit one built from
    /// its fields.
    pub(crate) fn model_for(&self, config: &StoreConfig) -> Result<Arc<Model>> {
        match &config.model {
            Some(name) => self
                .model(name)
                .ok_or_else(|| Error::UnknownModel(name.clone())),
            None if !config.fields.is_empty() => {
                let name = config
                    .store_id
                    .clone()
                    .unwrap_or_else(|| "implicit".to_string());
                Ok(Arc::new(Model::new(name, config.fields.clone())))
            }
            None => Err(Error::MissingModel),
        }
    }

    /// The store's proxy, else the model's, else the memory proxy.
    pub(crate) fn proxy_for(
        &self,
        config: &StoreConfig,
        model: &Arc<Model>,
    ) -> Result<Arc<dyn Proxy>> {
        let proxy = config
            .proxy
            .clone()
            .or_else(|| model.proxy.clone())
            .unwrap_or_else(|| ProxyConfig::new(DEFAULT_PROXY_TYPE));
        self.create_proxy(&proxy, model)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("proxies", &self.proxies.keys().collect::<Vec<_>>())
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// `{"type": "memory", "data": [...]}`
fn memory_proxy(config: &ProxyConfig, model: &Arc<Model>) -> Result<Arc<dyn Proxy>> {
    let rows = match config.params.get("data") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object().cloned().ok_or_else(|| {
                    Error::InvalidConfig("memory proxy data rows must be objects".into())
                })
            })
            .collect::<Result<Vec<Fields>>>()?,
        Some(_) => {
            return Err(Error::InvalidConfig("memory proxy data must be an array".into()));
        }
    };
    Ok(Arc::new(MemoryProxy::with_data(Arc::clone(model), rows)))
}
