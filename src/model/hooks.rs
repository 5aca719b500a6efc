use std::sync::Arc;

use async_trait::async_trait;

use super::{Entity, Model, OperationKind};
use crate::core::Result;
use crate::storage::StorageContext;

/// Callbacks wrapped around the engine operations of model `M`.
///
/// Every method defaults to a no-op, so implementors only override the
/// points they care about. A hook that fails aborts the surrounding
/// operation with its error.
#[async_trait]
pub trait LifecycleHooks<M: Model>: Send + Sync {
    /// Runs before the outbound field set is built; changes made here are
    /// persisted by the same save.
    async fn pre_save(
        &self,
        _context: &StorageContext,
        _entity: &mut Entity<M>,
        _operation: OperationKind,
    ) -> Result<()> {
        Ok(())
    }

    /// Runs after a successful save. Replacing `*entity` replaces what the
    /// caller holds.
    async fn post_save(
        &self,
        _context: &StorageContext,
        _entity: &mut Entity<M>,
        _operation: OperationKind,
    ) -> Result<()> {
        Ok(())
    }

    async fn post_load(&self, _context: &StorageContext, _entity: &mut Entity<M>) -> Result<()> {
        Ok(())
    }

    async fn post_delete(&self, _context: &StorageContext, _entity: &Entity<M>) -> Result<()> {
        Ok(())
    }
}

/// Hook sets invoked in registration order.
pub struct HookPipeline<M: Model> {
    hooks: Vec<Arc<dyn LifecycleHooks<M>>>,
}

impl<M: Model> HookPipeline<M> {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn push(&mut self, hooks: Arc<dyn LifecycleHooks<M>>) {
        self.hooks.push(hooks);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub async fn pre_save(
        &self,
        context: &StorageContext,
        entity: &mut Entity<M>,
        operation: OperationKind,
    ) -> Result<()> {
        for hooks in &self.hooks {
            hooks.pre_save(context, entity, operation).await?;
        }
        Ok(())
    }

    pub async fn post_save(
        &self,
        context: &StorageContext,
        entity: &mut Entity<M>,
        operation: OperationKind,
    ) -> Result<()> {
        for hooks in &self.hooks {
            hooks.post_save(context, entity, operation).await?;
        }
        Ok(())
    }

    pub async fn post_load(&self, context: &StorageContext, entity: &mut Entity<M>) -> Result<()> {
        for hooks in &self.hooks {
            hooks.post_load(context, entity).await?;
        }
        Ok(())
    }

    pub async fn post_delete(&self, context: &StorageContext, entity: &Entity<M>) -> Result<()> {
        for hooks in &self.hooks {
            hooks.post_delete(context, entity).await?;
        }
        Ok(())
    }
}

impl<M: Model> Default for HookPipeline<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for HookPipeline<M> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}
