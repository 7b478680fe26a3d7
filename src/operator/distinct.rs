//! Per-epoch deduplication on a projected key.

use super::groupby::GroupTable;
use super::{reject, BoxedOperator, Operator, Projection};
use crate::error::Result;
use crate::record::{GroupKey, Record, Value};

/// Remembers each distinct projected key seen in the epoch and emits
/// `ctx + key fields` once per key on flush.
pub struct Distinct {
    projection: Projection,
    seen: GroupTable,
    next: BoxedOperator,
}

impl Distinct {
    pub fn new(projection: impl Fn(&Record) -> Result<GroupKey> + 'static, next: BoxedOperator) -> Self {
        Self {
            projection: Box::new(projection),
            seen: GroupTable::default(),
            next,
        }
    }

    pub fn distinct_keys(&self) -> usize {
        self.seen.len()
    }
}

impl Operator for Distinct {
    fn accept(&mut self, record: &Record) -> Result<()> {
        match (self.projection)(record) {
            Ok(key) => {
                if self.seen.get(&key).is_none() {
                    self.seen.upsert(key, Value::Empty);
                }
                Ok(())
            }
            Err(e) => reject("distinct", e),
        }
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        for (key, _) in self.seen.drain() {
            self.next.accept(&Record::merge(key.fields(), ctx))?;
        }
        self.next.flush(ctx)
    }
}
