use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use super::StorageContext;
use crate::core::Result;

/// Compute-once slot for an adapter's [`StorageContext`].
///
/// Concurrent callers wait on the first initialization and then share its
/// result. A failed initialization leaves the slot empty.
#[derive(Debug, Default)]
pub struct ContextCache {
    slot: Mutex<Option<StorageContext>>,
    initializations: AtomicU64,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<StorageContext>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<StorageContext>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(context) = slot.as_ref() {
            return Ok(context.clone());
        }

        let context = init().await?;
        self.initializations.fetch_add(1, Ordering::Relaxed);
        *slot = Some(context.clone());
        Ok(context)
    }

    /// Drops the cached context; the next call re-initializes.
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }

    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub fn initializations(&self) -> u64 {
        self.initializations.load(Ordering::Relaxed)
    }
}
