// ============================================================================
// memomodel Library
// ============================================================================

//! Minimal object-persistence mapper.
//!
//! An [`Entity`] holds untyped field values for one model type and tracks
//! which fields changed since the last save, so updates only send those
//! fields. A [`PersistenceBinding`] connects the model type to a
//! [`StorageAdapter`], per-field policies and lifecycle hooks.
//!
//! ```
//! use std::sync::Arc;
//! use memomodel::{Binder, Entity, FieldSpec, FieldSpecRegistry, MemoryAdapter, Value};
//!
//! memomodel::model! {
//!     pub struct Counter as "counters" { name, count, scratch }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> memomodel::Result<()> {
//! let adapter = Arc::new(MemoryAdapter::new("counters"));
//! Binder::<Counter>::new(adapter)
//!     .fields(FieldSpecRegistry::new().field("scratch", FieldSpec::new().skip()))
//!     .register()?;
//!
//! let mut counter = Entity::<Counter>::new([("name", Value::from("A")), ("count", Value::from(1i64))])?;
//! counter.save().await?;
//! assert!(counter.is_persisted());
//!
//! counter.set("count", 2i64)?;
//! assert_eq!(counter.changed_fields(), vec!["count"]);
//! counter.save().await?;
//!
//! let id = counter.id().cloned().unwrap();
//! let loaded = Entity::<Counter>::find(id).await?.unwrap();
//! assert_eq!(loaded.get("count")?, &Value::Integer(2));
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod model;
pub mod prelude;
pub mod storage;

pub use core::{Criteria, ModelError, Result, Row, Value, row_from};
pub use model::{
    Binder, BoolIntEncoder, Entity, EntityState, FieldSpec, FieldSpecRegistry, FnEncoder,
    HookPipeline, JsonTextEncoder, LifecycleHooks, Model, OperationKind, PersistenceBinding,
    SaveOutcome, TimestampEncoder, ValueEncoder,
};
pub use storage::{
    ContextCache, IdStrategy, MemoryAdapter, MemoryAdapterConfig, StorageAdapter, StorageContext,
    WriteOutcome,
};

// Re-exported so hook and adapter implementors use the same macro version.
pub use async_trait::async_trait;
