use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use super::binding::SaveOutcome;
use super::{Model, registry};
use crate::core::{Criteria, ModelError, Result, Row, Value};

static NULL: Value = Value::Null;

/// Lifecycle position of an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Constructed in memory, never saved.
    New,
    /// Saved at least once, or loaded from storage.
    Persisted,
    /// Removed from storage; the instance is a dangling handle.
    Deleted,
}

/// One in-memory record of model `M`.
///
/// Fields set through [`set`](Self::set) are tracked as changed until the
/// next successful save; [`put`](Self::put) writes without tracking.
pub struct Entity<M: Model> {
    fields: Row,
    changed: BTreeSet<String>,
    state: EntityState,
    _model: PhantomData<M>,
}

impl<M: Model> Entity<M> {
    /// Creates an unsaved entity. Every initial field counts as changed.
    pub fn new<I, K, V>(initial: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let values = initial.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::construct(values, false)
    }

    /// Creates an entity that already exists in storage. Nothing is marked
    /// changed.
    pub fn restore(values: Row) -> Result<Self> {
        Self::construct(values, true)
    }

    pub fn construct(values: Row, persisted: bool) -> Result<Self> {
        let mut entity = Self {
            fields: Row::new(),
            changed: BTreeSet::new(),
            state: EntityState::New,
            _model: PhantomData,
        };

        if persisted {
            entity.put_many(values)?;
            entity.state = EntityState::Persisted;
        } else {
            entity.set_many(values)?;
        }

        Ok(entity)
    }

    /// Current value of a declared field; `Null` when unset.
    pub fn get(&self, field: &str) -> Result<&Value> {
        Self::ensure_declared(field)?;
        Ok(self.fields.get(field).unwrap_or(&NULL))
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self> {
        let field = field.into();
        self.write(&field, value.into())?;
        self.changed.insert(field);
        Ok(self)
    }

    pub fn set_many<I, K, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (field, value) in values {
            self.set(field, value)?;
        }
        Ok(self)
    }

    /// Writes a value without marking the field changed.
    pub fn put(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self> {
        let field = field.into();
        self.write(&field, value.into())?;
        Ok(self)
    }

    pub fn put_many<I, K, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (field, value) in values {
            self.put(field, value)?;
        }
        Ok(self)
    }

    /// Fields changed since construction or the last successful save, in
    /// field-name order. Treat the result as a set.
    pub fn changed_fields(&self) -> Vec<String> {
        self.changed.iter().cloned().collect()
    }

    pub fn is_changed(&self, field: &str) -> bool {
        self.changed.contains(field)
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn mark_changed(&mut self, field: &str) -> Result<&mut Self> {
        Self::ensure_declared(field)?;
        self.changed.insert(field.to_string());
        Ok(self)
    }

    pub fn mark_unchanged(&mut self, field: &str) -> &mut Self {
        self.changed.remove(field);
        self
    }

    pub fn clear_changed_fields(&mut self) -> &mut Self {
        self.changed.clear();
        self
    }

    /// The identifier, once assigned.
    pub fn id(&self) -> Option<&Value> {
        self.fields.get(M::ID_FIELD).filter(|id| !id.is_null())
    }

    pub fn fields(&self) -> &Row {
        &self.fields
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn is_new(&self) -> bool {
        self.state == EntityState::New
    }

    /// True after the first save or load. Stays true after deletion.
    pub fn is_persisted(&self) -> bool {
        matches!(self.state, EntityState::Persisted | EntityState::Deleted)
    }

    pub fn is_deleted(&self) -> bool {
        self.state == EntityState::Deleted
    }

    pub(crate) fn mark_saved(&mut self) {
        self.state = EntityState::Persisted;
        self.changed.clear();
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.state = EntityState::Deleted;
    }

    fn write(&mut self, field: &str, value: Value) -> Result<()> {
        Self::ensure_declared(field)?;

        if field == M::ID_FIELD && self.is_persisted() {
            if let Some(current) = self.id() {
                if *current != value {
                    return Err(ModelError::IdentifierImmutable(M::NAME));
                }
            }
        }

        self.fields.insert(field.to_string(), value);
        Ok(())
    }

    fn ensure_declared(field: &str) -> Result<()> {
        if M::is_declared(field) {
            Ok(())
        } else {
            Err(ModelError::FieldNotDeclared {
                model: M::NAME,
                field: field.to_string(),
            })
        }
    }
}

/// Operations routed through the binding registered for `M`.
impl<M: Model> Entity<M> {
    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let binding = registry::binding::<M>()?;
        binding.save(self).await
    }

    pub async fn delete(&mut self) -> Result<bool> {
        let binding = registry::binding::<M>()?;
        binding.delete(self).await
    }

    pub async fn find(id: impl Into<Value>) -> Result<Option<Self>> {
        let binding = registry::binding::<M>()?;
        binding.get(id).await
    }

    pub async fn find_by(criteria: impl Into<Criteria>) -> Result<Option<Self>> {
        let binding = registry::binding::<M>()?;
        binding.get_by(criteria).await
    }

    pub async fn all(criteria: Option<Criteria>) -> Result<Vec<Self>> {
        let binding = registry::binding::<M>()?;
        binding.all(criteria).await
    }
}

impl<M: Model> Clone for Entity<M> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            changed: self.changed.clone(),
            state: self.state,
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Entity<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("model", &M::NAME)
            .field("state", &self.state)
            .field("fields", &self.fields)
            .field("changed", &self.changed)
            .finish()
    }
}
