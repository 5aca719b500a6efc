//! Process-wide lookup table from model type to its binding.
//!
//! Populated once per model at startup through [`Binder::register`]; entries
//! are never replaced or removed.
//!
//! [`Binder::register`]: super::Binder::register

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use super::{Model, PersistenceBinding};
use crate::core::{ModelError, Result};

type AnyBinding = Arc<dyn Any + Send + Sync>;

lazy_static! {
    static ref BINDINGS: RwLock<HashMap<TypeId, AnyBinding>> = RwLock::new(HashMap::new());
}

pub(crate) fn register<M: Model>(binding: Arc<PersistenceBinding<M>>) -> Result<()> {
    let mut bindings = BINDINGS.write()?;
    if bindings.contains_key(&TypeId::of::<M>()) {
        return Err(ModelError::AlreadyBound(M::NAME));
    }
    bindings.insert(TypeId::of::<M>(), binding);
    log::debug!("Registered persistence binding for '{}'", M::NAME);
    Ok(())
}

/// The binding registered for `M`.
pub fn binding<M: Model>() -> Result<Arc<PersistenceBinding<M>>> {
    let bindings = BINDINGS.read()?;
    let entry = bindings
        .get(&TypeId::of::<M>())
        .cloned()
        .ok_or(ModelError::NotBound(M::NAME))?;
    entry
        .downcast::<PersistenceBinding<M>>()
        .map_err(|_| ModelError::IllegalState(format!("binding type mismatch for '{}'", M::NAME)))
}

pub fn is_bound<M: Model>() -> bool {
    BINDINGS
        .read()
        .map(|bindings| bindings.contains_key(&TypeId::of::<M>()))
        .unwrap_or(false)
}
