//! Filter, Map and Split: operators without per-epoch state.

use super::{reject, BoxedOperator, Operator, Predicate, Transform};
use crate::error::Result;
use crate::record::{Record, Value};

/// Forwards records for which the predicate holds. Flushes always pass.
pub struct Filter {
    predicate: Predicate,
    next: BoxedOperator,
}

impl Filter {
    pub fn new(predicate: impl Fn(&Record) -> Result<bool> + 'static, next: BoxedOperator) -> Self {
        Self {
            predicate: Box::new(predicate),
            next,
        }
    }
}

impl Operator for Filter {
    fn accept(&mut self, record: &Record) -> Result<()> {
        match (self.predicate)(record) {
            Ok(true) => self.next.accept(record),
            Ok(false) => Ok(()),
            Err(e) => reject("filter", e),
        }
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        self.next.flush(ctx)
    }
}

/// Forwards `transform(record)`. Flushes always pass.
pub struct Map {
    transform: Transform,
    next: BoxedOperator,
}

impl Map {
    pub fn new(transform: impl Fn(&Record) -> Result<Record> + 'static, next: BoxedOperator) -> Self {
        Self {
            transform: Box::new(transform),
            next,
        }
    }
}

impl Operator for Map {
    fn accept(&mut self, record: &Record) -> Result<()> {
        match (self.transform)(record) {
            Ok(out) => self.next.accept(&out),
            Err(e) => reject("map", e),
        }
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        self.next.flush(ctx)
    }
}

/// Sends every record and flush to two independent downstream operators.
pub struct Split {
    first: BoxedOperator,
    second: BoxedOperator,
}

impl Split {
    pub fn new(first: BoxedOperator, second: BoxedOperator) -> Self {
        Self { first, second }
    }

    /// Chain of splits delivering to every operator in `ops`, in order.
    pub fn fan_out(ops: Vec<BoxedOperator>) -> BoxedOperator {
        let mut rev = ops.into_iter().rev();
        let Some(mut acc) = rev.next() else {
            return Discard.boxed();
        };
        for op in rev {
            acc = Split::new(op, acc).boxed();
        }
        acc
    }
}

impl Operator for Split {
    // The second branch still sees the call when the first one fails.
    fn accept(&mut self, record: &Record) -> Result<()> {
        let first = self.first.accept(record);
        let second = self.second.accept(record);
        first.and(second)
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        let first = self.first.flush(ctx);
        let second = self.second.flush(ctx);
        first.and(second)
    }
}

/// Terminal operator that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl Operator for Discard {
    fn accept(&mut self, _record: &Record) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self, _ctx: &Record) -> Result<()> {
        Ok(())
    }
}

/// Predicate: integer field `field` is at least `threshold`.
pub fn key_geq_int(field: impl Into<String>, threshold: i64) -> impl Fn(&Record) -> Result<bool> {
    let field = field.into();
    move |r: &Record| Ok(r.int(&field)? >= threshold)
}

/// Predicate: integer field `field` is at most `threshold`.
pub fn key_leq_int(field: impl Into<String>, threshold: i64) -> impl Fn(&Record) -> Result<bool> {
    let field = field.into();
    move |r: &Record| Ok(r.int(&field)? <= threshold)
}

/// Transform: copy of the record with `name` set to `compute(record)`.
pub fn with_field(
    name: impl Into<String>,
    compute: impl Fn(&Record) -> Result<Value>,
) -> impl Fn(&Record) -> Result<Record> {
    let name = name.into();
    move |r: &Record| Ok(r.with(name.clone(), compute(r)?))
}
