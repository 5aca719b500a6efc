//! Common imports for application code.
//!
//! `use memomodel::prelude::*;` brings in the entity API, binding builder,
//! field specs, built-in encoders and the adapter contract.

pub use crate::core::{Criteria, ModelError, Result, Row, Value, row_from};
pub use crate::model::{
    Binder, BoolIntEncoder, Entity, FieldSpec, FieldSpecRegistry, JsonTextEncoder,
    LifecycleHooks, Model, OperationKind, TimestampEncoder, ValueEncoder,
};
pub use crate::storage::{MemoryAdapter, StorageAdapter, StorageContext, WriteOutcome};
pub use crate::{async_trait, model};
