//! Row filters for [`MemoryAdapter`](super::MemoryAdapter).
//!
//! Raw queries use a small dialect: comparisons joined by `AND`, each of the
//! form `field <op> ?` with `op` one of `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`.
//! Placeholders consume bind values left to right. An empty query or `*`
//! matches every row.

use std::cmp::Ordering;

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::{Criteria, ModelError, Result, Row, Value};

lazy_static! {
    static ref AND_SPLIT: Regex = Regex::new(r"(?i)\s+and\s+").unwrap();
    static ref CLAUSE: Regex =
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(=|!=|<>|<=|>=|<|>)\s*\?\s*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Op {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::LtEq),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::GtEq),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Clause {
    field: String,
    op: Op,
    value: Value,
}

impl Clause {
    fn matches(&self, row: &Row) -> bool {
        let actual = row.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            Op::Eq => *actual == self.value,
            Op::NotEq => *actual != self.value,
            _ if actual.is_null() || self.value.is_null() => false,
            op => match actual.compare(&self.value) {
                Ok(ordering) => match op {
                    Op::Lt => ordering == Ordering::Less,
                    Op::LtEq => ordering != Ordering::Greater,
                    Op::Gt => ordering == Ordering::Greater,
                    Op::GtEq => ordering != Ordering::Less,
                    Op::Eq | Op::NotEq => unreachable!(),
                },
                Err(_) => false,
            },
        }
    }
}

/// Compiled form of a [`Criteria`].
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn compile(criteria: Option<&Criteria>) -> Result<Self> {
        match criteria {
            None => Ok(Self::match_all()),
            Some(Criteria::Fields(fields)) => Ok(Self {
                clauses: fields
                    .iter()
                    .map(|(field, value)| Clause {
                        field: field.clone(),
                        op: Op::Eq,
                        value: value.clone(),
                    })
                    .collect(),
            }),
            Some(Criteria::Query { query, binds }) => Self::parse(query, binds),
        }
    }

    fn parse(query: &str, binds: &[Value]) -> Result<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() || trimmed == "*" {
            if !binds.is_empty() {
                return Err(ModelError::UnsupportedQuery(format!(
                    "{} bind values supplied to a match-all query",
                    binds.len()
                )));
            }
            return Ok(Self::match_all());
        }

        let mut binds = binds.iter();
        let mut clauses = Vec::new();
        for part in AND_SPLIT.split(trimmed) {
            let captures = CLAUSE
                .captures(part)
                .ok_or_else(|| ModelError::UnsupportedQuery(format!("cannot parse '{}'", part.trim())))?;
            let op = Op::parse(&captures[2])
                .ok_or_else(|| ModelError::UnsupportedQuery(format!("unknown operator '{}'", &captures[2])))?;
            let value = binds.next().cloned().ok_or_else(|| {
                ModelError::UnsupportedQuery(format!("missing bind value for '{}'", part.trim()))
            })?;
            clauses.push(Clause {
                field: captures[1].to_string(),
                op,
                value,
            });
        }

        let extra = binds.count();
        if extra > 0 {
            return Err(ModelError::UnsupportedQuery(format!(
                "{} unused bind value(s) in '{}'",
                extra, trimmed
            )));
        }

        Ok(Self { clauses })
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.clauses.iter().all(|clause| clause.matches(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::row_from;

    fn sample() -> Row {
        row_from([
            ("name", Value::from("A")),
            ("count", Value::Integer(3)),
            ("note", Value::Null),
        ])
    }

    #[test]
    fn test_field_criteria_is_conjunctive() {
        let hit = Criteria::fields([("name", Value::from("A")), ("count", Value::Integer(3))]);
        let miss = Criteria::fields([("name", Value::from("A")), ("count", Value::Integer(4))]);
        assert!(Filter::compile(Some(&hit)).unwrap().matches(&sample()));
        assert!(!Filter::compile(Some(&miss)).unwrap().matches(&sample()));
    }

    #[test]
    fn test_missing_column_equals_null() {
        let criteria = Criteria::fields([("absent", Value::Null)]);
        assert!(Filter::compile(Some(&criteria)).unwrap().matches(&sample()));
    }

    #[test]
    fn test_query_with_binds() {
        let criteria = Criteria::query("name = ? and count >= ?").bind("A").bind(2i64);
        assert!(Filter::compile(Some(&criteria)).unwrap().matches(&sample()));

        let criteria = Criteria::query("count < ?").bind(3i64);
        assert!(!Filter::compile(Some(&criteria)).unwrap().matches(&sample()));

        let criteria = Criteria::query("name <> ?").bind("B");
        assert!(Filter::compile(Some(&criteria)).unwrap().matches(&sample()));
    }

    #[test]
    fn test_ordering_against_null_never_matches() {
        let criteria = Criteria::query("note > ?").bind(1i64);
        assert!(!Filter::compile(Some(&criteria)).unwrap().matches(&sample()));
    }

    #[test]
    fn test_match_all_forms() {
        assert!(Filter::compile(None).unwrap().matches(&sample()));
        assert!(Filter::compile(Some(&Criteria::query("*"))).unwrap().matches(&sample()));
        assert!(Filter::compile(Some(&Criteria::query(""))).unwrap().matches(&sample()));
    }

    #[test]
    fn test_bind_count_mismatch() {
        let missing = Criteria::query("name = ? AND count = ?").bind("A");
        assert!(Filter::compile(Some(&missing)).is_err());

        let extra = Criteria::query("name = ?").bind("A").bind(1i64);
        assert!(Filter::compile(Some(&extra)).is_err());
    }

    #[test]
    fn test_unsupported_syntax() {
        let criteria = Criteria::query("name LIKE ?").bind("A%");
        assert!(matches!(
            Filter::compile(Some(&criteria)),
            Err(ModelError::UnsupportedQuery(_))
        ));
    }
}
