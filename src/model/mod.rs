//! Model persistence engine.
//!
//! An entity type is a zero-sized [`Model`] marker; its instances are
//! [`Entity<M>`] values holding untyped fields plus change tracking. A
//! [`PersistenceBinding<M>`] ties the type to one storage adapter, its field
//! specs and its lifecycle hooks.

use std::fmt;

pub mod binding;
pub mod encoder;
pub mod entity;
pub mod field_spec;
pub mod hooks;
mod macros;
pub mod registry;

pub use binding::{Binder, PersistenceBinding, SaveOutcome};
pub use encoder::{BoolIntEncoder, EncodeResult, FnEncoder, JsonTextEncoder, TimestampEncoder, ValueEncoder};
pub use entity::{Entity, EntityState};
pub use field_spec::{FieldSpec, FieldSpecRegistry};
pub use hooks::{HookPipeline, LifecycleHooks};

/// Schema marker for one entity type.
///
/// Usually generated with [`model!`](crate::model!).
pub trait Model: Send + Sync + 'static {
    /// Name used in logs and errors.
    const NAME: &'static str;
    /// Declared field names, excluding the identifier.
    const FIELDS: &'static [&'static str];
    const ID_FIELD: &'static str = "id";

    fn is_declared(field: &str) -> bool {
        field == Self::ID_FIELD || Self::FIELDS.iter().any(|declared| *declared == field)
    }
}

/// Whether a save creates a new record or changes an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Update,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
