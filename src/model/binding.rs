use std::sync::Arc;

use tracing::{Instrument, Level, event, info_span};

use super::field_spec::FieldSpecRegistry;
use super::hooks::{HookPipeline, LifecycleHooks};
use super::{Entity, Model, OperationKind, registry};
use crate::core::{Criteria, ModelError, Result, Row, Value};
use crate::storage::{StorageAdapter, StorageContext};

/// Result of [`PersistenceBinding::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// `None` when the save was skipped because nothing needed persisting.
    pub operation: Option<OperationKind>,
    pub rows_affected: u64,
}

impl SaveOutcome {
    pub fn skipped() -> Self {
        Self {
            operation: None,
            rows_affected: 0,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.operation.is_none()
    }
}

/// Builder for a [`PersistenceBinding`].
///
/// ```ignore
/// let users = Binder::<User>::new(Arc::new(MemoryAdapter::new("users")))
///     .fields(FieldSpecRegistry::new().field("password", FieldSpec::new().skip()))
///     .hooks(AuditHooks::default())
///     .register()?;
/// ```
pub struct Binder<M: Model> {
    adapter: Arc<dyn StorageAdapter>,
    fields: FieldSpecRegistry,
    hooks: HookPipeline<M>,
}

impl<M: Model> Binder<M> {
    pub fn new(adapter: Arc<dyn StorageAdapter>) -> Self {
        Self {
            adapter,
            fields: FieldSpecRegistry::new(),
            hooks: HookPipeline::new(),
        }
    }

    pub fn fields(mut self, fields: FieldSpecRegistry) -> Self {
        self.fields = fields;
        self
    }

    /// Appends a hook set; hook sets run in the order they were added.
    pub fn hooks(mut self, hooks: impl LifecycleHooks<M> + 'static) -> Self {
        self.hooks.push(Arc::new(hooks));
        self
    }

    pub fn shared_hooks(mut self, hooks: Arc<dyn LifecycleHooks<M>>) -> Self {
        self.hooks.push(hooks);
        self
    }

    /// Builds a binding without publishing it in the type registry.
    pub fn build(self) -> Arc<PersistenceBinding<M>> {
        Arc::new(PersistenceBinding {
            adapter: self.adapter,
            fields: self.fields,
            hooks: self.hooks,
        })
    }

    /// Builds the binding and publishes it as the one used by
    /// [`Entity`]'s own `save`/`delete`/`find` methods.
    pub fn register(self) -> Result<Arc<PersistenceBinding<M>>> {
        let binding = self.build();
        registry::register(binding.clone())?;
        Ok(binding)
    }
}

/// Immutable association of model `M` with its adapter, field specs and
/// hooks. Shared by every instance and lookup of `M`.
pub struct PersistenceBinding<M: Model> {
    adapter: Arc<dyn StorageAdapter>,
    fields: FieldSpecRegistry,
    hooks: HookPipeline<M>,
}

impl<M: Model> std::fmt::Debug for PersistenceBinding<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceBinding").finish_non_exhaustive()
    }
}

impl<M: Model> PersistenceBinding<M> {
    pub fn adapter(&self) -> &Arc<dyn StorageAdapter> {
        &self.adapter
    }

    pub fn field_specs(&self) -> &FieldSpecRegistry {
        &self.fields
    }

    pub fn hooks(&self) -> &HookPipeline<M> {
        &self.hooks
    }

    /// Whether any changed field would be sent to the adapter.
    pub fn has_pending_changes(&self, entity: &Entity<M>) -> bool {
        entity
            .changed_fields()
            .iter()
            .any(|field| self.fields.persists(field))
    }

    /// Changed, persisted fields of `entity`, encoded for storage.
    pub fn outbound(&self, entity: &Entity<M>) -> Result<Row> {
        let mut outbound = Row::new();
        for field in entity.changed_fields() {
            if !self.fields.persists(&field) {
                continue;
            }
            let value = entity.get(&field)?;
            let encoded = self.fields.encode(&field, value)?;
            outbound.insert(field, encoded);
        }
        Ok(outbound)
    }

    /// Turns a raw row into a persisted entity, decoding each kept field.
    ///
    /// Skipped fields and columns the model does not declare are dropped; the
    /// identifier is always kept.
    pub fn reconstruct(&self, row: Row) -> Result<Entity<M>> {
        let mut values = Row::new();
        for (field, raw) in row {
            if field == M::ID_FIELD {
                let id = self.fields.decode(&field, raw)?;
                values.insert(field, id);
                continue;
            }
            if !M::is_declared(&field) {
                log::debug!("Dropping undeclared column '{}' for '{}'", field, M::NAME);
                continue;
            }
            if !self.fields.persists(&field) {
                continue;
            }
            let value = self.fields.decode(&field, raw)?;
            values.insert(field, value);
        }
        Entity::restore(values)
    }

    /// Inserts a new entity or sends its changed fields as an update.
    ///
    /// On any error the entity keeps its state and change set. The one
    /// failure reported after the adapter committed is `MissingIdentifier`:
    /// the adapter stored the row but returned no identifier and the entity
    /// carried none, so the row cannot be tied back to the entity. Only an
    /// adapter that breaks the insert contract causes it.
    pub async fn save(&self, entity: &mut Entity<M>) -> Result<SaveOutcome> {
        if entity.is_deleted() {
            return Err(ModelError::IllegalState(format!(
                "cannot save a deleted '{}'",
                M::NAME
            )));
        }

        if entity.is_persisted() && !self.has_pending_changes(entity) {
            event!(Level::DEBUG, model = M::NAME, "save skipped, nothing to persist");
            return Ok(SaveOutcome::skipped());
        }

        let operation = if entity.is_persisted() {
            OperationKind::Update
        } else {
            OperationKind::Insert
        };

        let span = info_span!("model.save", model = M::NAME, operation = %operation);
        self.dispatch_save(entity, operation).instrument(span).await
    }

    async fn dispatch_save(
        &self,
        entity: &mut Entity<M>,
        operation: OperationKind,
    ) -> Result<SaveOutcome> {
        let context = self.adapter.context().await?;

        self.hooks.pre_save(&context, entity, operation).await?;
        let outbound = self.outbound(entity)?;

        let outcome = match operation {
            OperationKind::Insert => self.adapter.insert(&context, &outbound).await?,
            OperationKind::Update => {
                let id = entity.id().cloned().ok_or_else(|| {
                    ModelError::IllegalState(format!("persisted '{}' has no identifier", M::NAME))
                })?;
                let id = self.fields.encode(M::ID_FIELD, &id)?;
                self.adapter.update(&context, &id, &outbound).await?
            }
        };

        if !outcome.success {
            event!(Level::WARN, adapter = self.adapter.name(), "adapter rejected save");
            return Err(ModelError::SaveFailed {
                model: M::NAME,
                operation: operation.as_str(),
            });
        }

        if operation == OperationKind::Insert {
            match outcome.id {
                Some(id) if !id.is_null() => {
                    let id = self.fields.decode(M::ID_FIELD, id)?;
                    entity.put(M::ID_FIELD, id)?;
                }
                _ if entity.id().is_some() => {}
                _ => {
                    event!(
                        Level::WARN,
                        adapter = self.adapter.name(),
                        "insert committed without an identifier, row left behind"
                    );
                    return Err(ModelError::MissingIdentifier(M::NAME));
                }
            }
        }

        entity.mark_saved();
        event!(
            Level::DEBUG,
            fields = outbound.len(),
            rows_affected = outcome.rows_affected,
            "entity saved"
        );

        self.hooks.post_save(&context, entity, operation).await?;

        Ok(SaveOutcome {
            operation: Some(operation),
            rows_affected: outcome.rows_affected,
        })
    }

    /// Deletes the stored record. Returns `false` when the adapter found
    /// nothing to delete; the entity is left untouched in that case.
    pub async fn delete(&self, entity: &mut Entity<M>) -> Result<bool> {
        if entity.is_deleted() {
            return Err(ModelError::IllegalState(format!(
                "'{}' is already deleted",
                M::NAME
            )));
        }
        let id = match entity.id() {
            Some(id) if entity.is_persisted() => id.clone(),
            _ => {
                return Err(ModelError::IllegalState(format!(
                    "cannot delete an unsaved '{}'",
                    M::NAME
                )));
            }
        };

        let span = info_span!("model.delete", model = M::NAME, id = %id);
        self.dispatch_delete(entity, &id).instrument(span).await
    }

    async fn dispatch_delete(&self, entity: &mut Entity<M>, id: &Value) -> Result<bool> {
        let context = self.adapter.context().await?;
        let stored_id = self.fields.encode(M::ID_FIELD, id)?;
        let deleted = self.adapter.delete(&context, &stored_id).await?;
        if deleted {
            entity.mark_deleted();
            self.hooks.post_delete(&context, entity).await?;
        } else {
            event!(Level::DEBUG, "nothing deleted");
        }
        Ok(deleted)
    }

    /// Loads one entity by its in-memory identifier; `None` when no row
    /// matches.
    pub async fn get(&self, id: impl Into<Value>) -> Result<Option<Entity<M>>> {
        let id = id.into();
        let span = info_span!("model.get", model = M::NAME, id = %id);
        self.fetch_one(Lookup::Id(&id)).instrument(span).await
    }

    /// Loads the single entity matching `criteria`; fails with
    /// `AmbiguousResult` when more than one row matches.
    pub async fn get_by(&self, criteria: impl Into<Criteria>) -> Result<Option<Entity<M>>> {
        let criteria = criteria.into();
        let span = info_span!("model.get_by", model = M::NAME);
        self.fetch_one(Lookup::Criteria(&criteria))
            .instrument(span)
            .await
    }

    /// Loads every entity matching `criteria`, or all of them.
    pub async fn all(&self, criteria: Option<Criteria>) -> Result<Vec<Entity<M>>> {
        let span = info_span!("model.all", model = M::NAME);
        self.fetch_all(criteria.as_ref()).instrument(span).await
    }

    async fn fetch_one(&self, lookup: Lookup<'_>) -> Result<Option<Entity<M>>> {
        let context = self.adapter.context().await?;
        let row = match lookup {
            Lookup::Id(id) => {
                let stored_id = self.fields.encode(M::ID_FIELD, id)?;
                self.adapter.get(&context, &stored_id).await?
            }
            Lookup::Criteria(criteria) => self.adapter.get_by(&context, criteria).await?,
        };
        match row {
            Some(row) => self.load_row(&context, row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_all(&self, criteria: Option<&Criteria>) -> Result<Vec<Entity<M>>> {
        let context = self.adapter.context().await?;
        let rows = self.adapter.all(&context, criteria).await?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            entities.push(self.load_row(&context, row).await?);
        }
        event!(Level::DEBUG, loaded = entities.len(), "entities loaded");
        Ok(entities)
    }

    async fn load_row(&self, context: &StorageContext, row: Row) -> Result<Entity<M>> {
        let mut entity = self.reconstruct(row)?;
        self.hooks.post_load(context, &mut entity).await?;
        Ok(entity)
    }
}

enum Lookup<'a> {
    Id(&'a Value),
    Criteria(&'a Criteria),
}
