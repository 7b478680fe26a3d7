//! Records: named scalar fields, the unit of stream data.
//!
//! A record handed to an operator is borrowed, never mutated in place; an
//! operator that needs a changed copy builds a new record.

pub mod fields;
mod key;
mod value;

pub use key::{GroupKey, JoinKey};
pub use value::Value;

use crate::error::{Result, StreamError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

/// Field name to value mapping. Field order is sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(name: impl Into<String>, value: Value) -> Self {
        let mut r = Self::new();
        r.insert(name, value);
        r
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Set a field while building a record. Returns the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// Copy of `self` with one field set.
    pub fn with(&self, name: impl Into<String>, value: Value) -> Record {
        let mut out = self.clone();
        out.insert(name, value);
        out
    }

    pub fn require(&self, name: &str) -> Result<&Value> {
        self.fields.get(name).ok_or_else(|| StreamError::missing(name))
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        let v = self.require(name)?;
        v.as_int().ok_or_else(|| mismatch(name, "int", v))
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        let v = self.require(name)?;
        v.as_float().ok_or_else(|| mismatch(name, "float", v))
    }

    pub fn ipv4(&self, name: &str) -> Result<Ipv4Addr> {
        let v = self.require(name)?;
        v.as_ipv4().ok_or_else(|| mismatch(name, "ipv4", v))
    }

    /// Fields of `primary` and `secondary`; `primary` wins on a name collision.
    pub fn merge(primary: &Record, secondary: &Record) -> Record {
        let mut out = secondary.clone();
        for (k, v) in &primary.fields {
            out.fields.insert(k.clone(), *v);
        }
        out
    }

    /// Sub-record of the named fields that are present. Absent names are skipped.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Record {
        names
            .iter()
            .filter_map(|n| {
                let n = n.as_ref();
                self.fields.get(n).map(|v| (n.to_string(), *v))
            })
            .collect()
    }

    /// Group key of the named fields; every name must be present.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<GroupKey> {
        let mut out = Record::new();
        for n in names {
            let n = n.as_ref();
            out.insert(n, *self.require(n)?);
        }
        Ok(out.into())
    }

    /// Group key built from `(from, to)` pairs: field `from` lands under `to`.
    pub fn rename<S: AsRef<str>>(&self, pairs: &[(S, S)]) -> Result<GroupKey> {
        let mut out = Record::new();
        for (from, to) in pairs {
            out.insert(to.as_ref(), *self.require(from.as_ref())?);
        }
        Ok(out.into())
    }
}

fn mismatch(field: &str, expected: &'static str, found: &Value) -> StreamError {
    StreamError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.kind(),
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Value); N]> for Record {
    fn from(pairs: [(K, Value); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.fields {
            write!(f, "\"{}\" => {}, ", k, v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> Record {
        Record::from([
            ("ipv4.src", Value::Ipv4(Ipv4Addr::new(10, 0, 0, 1))),
            ("ipv4.dst", Value::Ipv4(Ipv4Addr::new(10, 0, 0, 2))),
            ("l4.dport", Value::Int(22)),
            ("time", Value::Float(0.5)),
        ])
    }

    #[test]
    fn typed_lookups() {
        let r = flow();
        assert_eq!(r.int("l4.dport").unwrap(), 22);
        assert_eq!(r.float("time").unwrap(), 0.5);
        assert!(matches!(
            r.int("time"),
            Err(StreamError::TypeMismatch { expected: "int", found: "float", .. })
        ));
        assert!(matches!(r.int("nope"), Err(StreamError::MissingField { .. })));
    }

    #[test]
    fn merge_prefers_primary() {
        let a = Record::from([("x", Value::Int(1)), ("y", Value::Int(2))]);
        let b = Record::from([("y", Value::Int(20)), ("z", Value::Int(30))]);
        let m = Record::merge(&a, &b);
        assert_eq!(m.int("x").unwrap(), 1);
        assert_eq!(m.int("y").unwrap(), 2);
        assert_eq!(m.int("z").unwrap(), 30);
    }

    #[test]
    fn project_is_strict_select_is_not() {
        let r = flow();
        assert!(r.project(&["ipv4.src", "missing"]).is_err());
        assert_eq!(r.select(&["ipv4.src", "missing"]).len(), 1);
        let key = r.project(&["ipv4.dst"]).unwrap();
        assert_eq!(key.fields().len(), 1);
    }

    #[test]
    fn rename_moves_fields() {
        let key = flow().rename(&[("ipv4.dst", "host")]).unwrap();
        assert_eq!(
            key.fields().ipv4("host").unwrap(),
            Ipv4Addr::new(10, 0, 0, 2)
        );
        assert!(!key.fields().contains("ipv4.dst"));
    }

    #[test]
    fn with_leaves_original_untouched() {
        let r = flow();
        let r2 = r.with("eid", Value::Int(3));
        assert!(!r.contains("eid"));
        assert_eq!(r2.int("eid").unwrap(), 3);
    }

    #[test]
    fn display_lists_fields() {
        let r = Record::from([("a", Value::Int(1)), ("b", Value::Empty)]);
        assert_eq!(r.to_string(), "\"a\" => 1, \"b\" => Empty, ");
    }
}
