//! # Dynamic Store Adapter
//!
//! A generic adapter that lets a host application manage multiple
//! independent, dynamically-typed record stores through a small uniform
//! command protocol: CRUD, ad-hoc filtered queries, and live subscriptions
//! that push full-snapshot result-set changes back to the host.
//!
//! ## Core Concepts
//!
//! - **Stores**: independently configured, named engine connections with a
//!   schema registry fixed at open time
//! - **Records**: schema-declared entities addressed by class name and the
//!   immutable `uuid` primary key, marshaled to and from generic field maps
//! - **Predicates**: ordered filter terms folded left-to-right into a
//!   compiled query (builder semantics, not an expression tree)
//! - **Subscriptions**: live queries pushing [`ChangeEvent`] snapshots over
//!   one outbound channel until explicitly cancelled
//!
//! ## Example
//!
//! ```ignore
//! use dynstore::{
//!     dispatch, CommandArgs, MemoryEngine, StoreConfig, StoreRegistry,
//!     ClassSchema, FieldKind, FieldSchema,
//! };
//!
//! let (registry, change_events) = StoreRegistry::new(MemoryEngine::new());
//!
//! let args = CommandArgs {
//!     store_id: Some("primary".into()),
//!     config: Some(StoreConfig::in_memory("app", vec![ClassSchema::new(
//!         "Recording",
//!         vec![FieldSchema::scalar("scheduleId", FieldKind::String)],
//!     )])),
//!     ..Default::default()
//! };
//! dispatch(&registry, "initialize", &args)?;
//!
//! // Drain change_events on the host's delivery context.
//! ```

pub mod batch;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod marshal;
pub mod predicate;
pub mod registry;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use dispatch::{dispatch, respond, CommandArgs, Outcome, Response};
pub use engine::{
    ChangeCallback, EngineConnection, ListenerToken, MemoryEngine, NativeRecord, NativeValue,
    StorageEngine,
};
pub use error::{AdapterError, Result};
pub use predicate::{CompiledQuery, GroupOp, Operator, PredicateTerm};
pub use registry::StoreRegistry;
pub use store::StoreInstance;
pub use subscriptions::SubscriptionManager;
pub use types::{
    ChangeEvent, ClassSchema, FieldKind, FieldMap, FieldSchema, StoreConfig, Value,
    PRIMARY_KEY_FIELD,
};
