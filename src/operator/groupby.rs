//! Group-reduce: fold records into one value per group key within an epoch.

use super::{reject, BoxedOperator, Fold, Operator, Projection};
use crate::error::{Result, StreamError};
use crate::record::{GroupKey, Record, Value};
use std::collections::HashMap;

/// Per-epoch key table that remembers first-insertion order, so results are
/// emitted in a stable order for a given input.
#[derive(Debug, Default)]
pub(crate) struct GroupTable {
    index: HashMap<GroupKey, usize>,
    entries: Vec<(GroupKey, Value)>,
}

impl GroupTable {
    pub(crate) fn get(&self, key: &GroupKey) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub(crate) fn upsert(&mut self, key: GroupKey, value: Value) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, (GroupKey, Value)> {
        self.index.clear();
        self.entries.drain(..)
    }
}

/// Folds records into one accumulator per projected key. On flush each group
/// is emitted as `ctx + key fields + {out_field: acc}` (key fields win over
/// ctx), then the flush is forwarded and the table cleared.
pub struct GroupBy {
    projection: Projection,
    fold: Fold,
    out_field: String,
    table: GroupTable,
    next: BoxedOperator,
}

impl GroupBy {
    pub fn new(
        projection: impl Fn(&Record) -> Result<GroupKey> + 'static,
        fold: impl Fn(&Value, &Record) -> Result<Value> + 'static,
        out_field: impl Into<String>,
        next: BoxedOperator,
    ) -> Self {
        Self {
            projection: Box::new(projection),
            fold: Box::new(fold),
            out_field: out_field.into(),
            table: GroupTable::default(),
            next,
        }
    }

    /// Number of groups accumulated in the current epoch.
    pub fn groups(&self) -> usize {
        self.table.len()
    }
}

impl Operator for GroupBy {
    fn accept(&mut self, record: &Record) -> Result<()> {
        let key = match (self.projection)(record) {
            Ok(k) => k,
            Err(e) => return reject("groupby", e),
        };
        let acc = self.table.get(&key).copied().unwrap_or(Value::Empty);
        match (self.fold)(&acc, record) {
            Ok(v) => {
                self.table.upsert(key, v);
                Ok(())
            }
            Err(e) => reject("groupby", e),
        }
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        // Dropping the drain clears the table even when a downstream accept fails.
        for (key, acc) in self.table.drain() {
            let out = Record::merge(key.fields(), ctx).with(self.out_field.clone(), acc);
            self.next.accept(&out)?;
        }
        self.next.flush(ctx)
    }
}

/// What a summing fold does when the summed field is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Reject the record; its group is left untouched.
    #[default]
    Reject,
    /// Count the record as contributing zero.
    Zero,
}

fn accumulator_mismatch(found: &Value) -> StreamError {
    StreamError::TypeMismatch {
        field: "accumulator".to_string(),
        expected: "int",
        found: found.kind(),
    }
}

/// Add `add` to an integer accumulator; overflow rejects the record.
fn add_to(acc: &Value, add: i64, field: &str) -> Result<Value> {
    let total = match acc {
        Value::Empty => Some(add),
        Value::Int(n) => n.checked_add(add),
        other => return Err(accumulator_mismatch(other)),
    };
    total.map(Value::Int).ok_or_else(|| StreamError::Overflow {
        field: field.to_string(),
    })
}

/// Fold counting records: Empty -> 1, Int(n) -> n + 1.
pub fn count() -> impl Fn(&Value, &Record) -> Result<Value> {
    |acc: &Value, _r: &Record| add_to(acc, 1, "count")
}

/// Fold summing the integer field `field`: Empty -> 0 + v, Int(n) -> n + v.
pub fn sum_int(
    field: impl Into<String>,
    on_missing: MissingPolicy,
) -> impl Fn(&Value, &Record) -> Result<Value> {
    let field = field.into();
    move |acc: &Value, r: &Record| {
        let add = match r.int(&field) {
            Ok(v) => v,
            Err(StreamError::MissingField { .. }) if on_missing == MissingPolicy::Zero => 0,
            Err(e) => return Err(e),
        };
        add_to(acc, add, &field)
    }
}

/// Projection keeping the named fields; records missing one are rejected.
pub fn fields<S: Into<String>>(names: impl IntoIterator<Item = S>) -> impl Fn(&Record) -> Result<GroupKey> {
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    move |r: &Record| r.project(&names)
}

/// Projection putting every record in the same group.
pub fn single_group() -> impl Fn(&Record) -> Result<GroupKey> {
    |_r: &Record| Ok(GroupKey::default())
}

/// Projection keeping and renaming fields given as `(from, to)` pairs.
pub fn renamed<S: Into<String>>(
    pairs: impl IntoIterator<Item = (S, S)>,
) -> impl Fn(&Record) -> Result<GroupKey> {
    let pairs: Vec<(String, String)> = pairs.into_iter().map(|(a, b)| (a.into(), b.into())).collect();
    move |r: &Record| r.rename(&pairs)
}
