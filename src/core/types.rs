use std::collections::BTreeMap;

use super::Value;

/// Field name to value mapping, ordered by field name.
///
/// Used for raw rows coming out of an adapter, outbound save payloads and
/// equality criteria alike.
pub type Row = BTreeMap<String, Value>;

/// Builds a [`Row`] from name/value pairs.
pub fn row_from<I, K, V>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Selection criteria handed to an adapter's lookup operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// Conjunctive equality over the listed fields.
    Fields(Row),
    /// Backend-specific query text with positional bind values.
    Query { query: String, binds: Vec<Value> },
}

impl Criteria {
    pub fn fields<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Fields(row_from(pairs))
    }

    pub fn query(query: impl Into<String>) -> Self {
        Self::Query {
            query: query.into(),
            binds: Vec::new(),
        }
    }

    /// Appends a positional bind value. No-op on field criteria.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        if let Self::Query { binds, .. } = &mut self {
            binds.push(value.into());
        }
        self
    }
}

impl From<Row> for Criteria {
    fn from(row: Row) -> Self {
        Self::Fields(row)
    }
}
