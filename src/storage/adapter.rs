use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Criteria, Result, Row, Value};

/// Opaque backend handle produced by [`StorageAdapter::context`].
///
/// Cheap to clone; adapters downcast it back to their own handle type.
#[derive(Clone)]
pub struct StorageContext {
    handle: Arc<dyn Any + Send + Sync>,
}

impl StorageContext {
    pub fn new<T: Any + Send + Sync>(handle: T) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    pub fn from_arc<T: Any + Send + Sync>(handle: Arc<T>) -> Self {
        Self { handle }
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.handle.clone().downcast::<T>().ok()
    }

    /// Whether both contexts wrap the same handle.
    pub fn same_handle(&self, other: &StorageContext) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }
}

impl fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageContext").finish_non_exhaustive()
    }
}

/// Adapter report for an insert or update.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub success: bool,
    pub inserted: bool,
    pub id: Option<Value>,
    pub rows_affected: u64,
}

impl WriteOutcome {
    pub fn inserted(id: Value) -> Self {
        Self {
            success: true,
            inserted: true,
            id: Some(id),
            rows_affected: 1,
        }
    }

    pub fn updated(id: Value, rows_affected: u64) -> Self {
        Self {
            success: true,
            inserted: false,
            id: Some(id),
            rows_affected,
        }
    }

    pub fn failed(inserted: bool) -> Self {
        Self {
            success: false,
            inserted,
            id: None,
            rows_affected: 0,
        }
    }
}

/// Backend operations required by a persistence binding.
///
/// Errors returned here reach the caller unchanged. Adapters own their
/// connection-level concurrency; the engine never times out or cancels a
/// call.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Acquires or reuses the backend handle.
    async fn context(&self) -> Result<StorageContext>;

    async fn get(&self, context: &StorageContext, id: &Value) -> Result<Option<Row>>;

    /// At most one matching row; `AmbiguousResult` when several match.
    async fn get_by(&self, context: &StorageContext, criteria: &Criteria) -> Result<Option<Row>>;

    /// Every matching row; `None` scans everything.
    async fn all(&self, context: &StorageContext, criteria: Option<&Criteria>) -> Result<Vec<Row>>;

    async fn insert(&self, context: &StorageContext, fields: &Row) -> Result<WriteOutcome>;

    async fn update(&self, context: &StorageContext, id: &Value, fields: &Row) -> Result<WriteOutcome>;

    async fn delete(&self, context: &StorageContext, id: &Value) -> Result<bool>;
}
