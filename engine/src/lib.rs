//! # Tether Engine
//!
//! A record-synchronization engine: a [`Store`] holds a working set of typed
//! records and reconciles it with a persistence backend through
//! create/update/destroy/read operations, broadcasting change events to
//! observers.
//!
//! ## Design Principles
//!
//! - **Backend agnostic**: the engine talks to storage only through the [`Proxy`] trait
//! - **Callback driven**: proxy calls return at once; results arrive through completions
//! - **Re-entrant**: no lock is held while proxies, listeners or callbacks run
//! - **Fail fast**: misconfiguration is an [`Error`] at construction, backend failure is data
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is a shared handle to field values plus lifecycle state:
//! - phantom: created locally, no backend identity yet
//! - dirty: edited since the last sync or commit
//! - clean: matches what the backend last confirmed
//!
//! Records report edits to the stores they are joined to; stores never poll.
//!
//! ### Operations
//!
//! An [`Operation`] describes one request: an [`Action`], its records, and
//! filters, sorters and paging for reads. The proxy sets its outcome exactly
//! once.
//!
//! ### Syncing
//!
//! [`Store::sync`] collects new, modified and removed records into a
//! [`Batch`] that runs create, update and destroy operations in turn.
//! [`BatchUpdateMode`] decides whether the store reconciles after each
//! operation or once the whole batch completes.
//!
//! ### Events
//!
//! Stores emit `add`, `remove`, `update`, `datachanged`, `beforeload`,
//! `load`, `beforesync`, `write` and `clear`. Listeners of `beforeload` and
//! `beforesync` may veto by returning `false`.
//!
//! ## Quick Start
//!
//! ```rust
//! use tether_engine::{FieldDef, FieldType, Model, OperationOptions, Registry, StoreConfig};
//!
//! // 1. Register a model
//! let registry = Registry::new().with_model(Model::new(
//!     "User",
//!     vec![FieldDef::required("name", FieldType::String)],
//! ));
//!
//! // 2. Build a store from configuration
//! let config = StoreConfig::from_json(
//!     r#"{
//!         "model": "User",
//!         "proxy": {"type": "memory", "data": [{"id": 1, "name": "Alice"}]}
//!     }"#,
//! )
//! .unwrap();
//! let store = registry.create_store(config).unwrap();
//!
//! // 3. Load, edit and sync
//! store.load(OperationOptions::default());
//! assert_eq!(store.count(), 1);
//!
//! let record = store.get_at(0).unwrap();
//! record.set("name", "Alicia");
//! assert_eq!(store.updated_records().len(), 1);
//!
//! store.sync();
//! assert!(!record.is_dirty());
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod manager;
pub mod memory;
pub mod model;
pub mod operation;
pub mod proxy;
pub mod record;
pub mod registry;
pub mod sorter;
pub mod store;

// Re-export main types at crate root
pub use batch::{Batch, BatchCompleteHook, BatchHook, BatchListeners, BatchOptions};
pub use config::{AutoLoad, BatchUpdateMode, ProxyConfig, StoreConfig};
pub use error::Error;
pub use events::{Control, EventName, ListenerId, Notifier, StoreEvent};
pub use filter::{decode_filters, Filter, FilterConfig, FilterInput, FilterSpec, Predicate};
pub use manager::StoreManager;
pub use memory::MemoryProxy;
pub use model::{FieldDef, FieldType, Model};
pub use operation::{Action, Operation, OperationCallback, OperationOptions, Outcome, ResultSet};
pub use proxy::{Completion, Proxy};
pub use record::{EditKind, Record};
pub use registry::{ProxyFactory, Registry, StoreFactory};
pub use sorter::{Comparator, SortDirection, SortState, Sorter};
pub use store::{BatchExceptionHandler, Store};

/// Type aliases for clarity
pub type Fields = serde_json::Map<String, serde_json::Value>;
pub type StoreId = String;
pub type OperationId = String;
pub type ModelName = String;
