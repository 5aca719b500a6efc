use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::encoder::ValueEncoder;
use crate::core::{ModelError, Result, Value};

/// Persistence policy for one field.
///
/// Fields without a spec are persisted as-is.
#[derive(Clone)]
pub struct FieldSpec {
    pub persist: bool,
    pub encoder: Option<Arc<dyn ValueEncoder>>,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self {
            persist: true,
            encoder: None,
        }
    }
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the field in memory only; it is never sent to or read from storage.
    pub fn skip(mut self) -> Self {
        self.persist = false;
        self
    }

    pub fn encoder(mut self, encoder: impl ValueEncoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    pub fn shared_encoder(mut self, encoder: Arc<dyn ValueEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("persist", &self.persist)
            .field("encoder", &self.encoder.is_some())
            .finish()
    }
}

/// Per-model map from field name to [`FieldSpec`].
#[derive(Debug, Clone, Default)]
pub struct FieldSpecRegistry {
    specs: HashMap<String, FieldSpec>,
}

impl FieldSpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.specs.insert(name.into(), spec);
        self
    }

    pub fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.specs.get(name)
    }

    pub fn persists(&self, name: &str) -> bool {
        self.specs.get(name).is_none_or(|spec| spec.persist)
    }

    pub fn encoder(&self, name: &str) -> Option<&Arc<dyn ValueEncoder>> {
        self.specs.get(name).and_then(|spec| spec.encoder.as_ref())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Applies the field's encoder, or returns the value unchanged.
    pub fn encode(&self, name: &str, value: &Value) -> Result<Value> {
        match self.encoder(name) {
            Some(encoder) => encoder
                .encode(value)
                .map_err(|message| ModelError::encoding(name, message)),
            None => Ok(value.clone()),
        }
    }

    /// Applies the field's decoder, or returns the raw value unchanged.
    pub fn decode(&self, name: &str, raw: Value) -> Result<Value> {
        match self.encoder(name) {
            Some(encoder) => encoder
                .decode(&raw)
                .map_err(|message| ModelError::encoding(name, message)),
            None => Ok(raw),
        }
    }
}
