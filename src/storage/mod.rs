pub mod adapter;
pub mod config;
pub mod context;
pub mod memory;
pub mod query;
pub mod snapshot;

pub use adapter::{StorageAdapter, StorageContext, WriteOutcome};
pub use config::{IdStrategy, MemoryAdapterConfig};
pub use context::ContextCache;
pub use memory::{MemoryAdapter, MemoryAdapterStats, MemoryHandle};
pub use query::Filter;
pub use snapshot::{CollectionSnapshot, SnapshotFile};
