//! Push operators and their composition.
//!
//! Every operator exposes `accept(record)` and `flush(ctx)`. Pipelines are
//! built innermost-first: each constructor takes the already-built downstream
//! operator, so the graph can never contain a cycle.
//!
//! - [`Filter`], [`Map`], [`Split`]: stateless plumbing
//! - [`Epoch`]: slices a timestamped stream into fixed-width epochs
//! - [`GroupBy`]: one folded value per key per epoch
//! - [`Distinct`]: set of distinct keys per epoch
//! - [`join`]: epoch-synchronized correlation of two streams
//! - [`MetaMeter`]: per-epoch record counts written to a side channel

mod distinct;
mod epoch;
mod groupby;
mod join;
mod meter;
mod stateless;

pub use distinct::Distinct;
pub use epoch::Epoch;
pub use groupby::{count, fields, renamed, single_group, sum_int, GroupBy, MissingPolicy};
pub use join::{join, JoinSide, JoinStats};
pub use meter::MetaMeter;
pub use stateless::{key_geq_int, key_leq_int, with_field, Discard, Filter, Map, Split};

use crate::error::{Result, StreamError};
use crate::record::{GroupKey, Record, Value};
use tracing::debug;

/// A push sink in a pipeline.
pub trait Operator {
    /// Consume one record; may push zero or more records downstream.
    fn accept(&mut self, record: &Record) -> Result<()>;

    /// Epoch boundary: emit buffered results, forward the flush, clear state.
    fn flush(&mut self, ctx: &Record) -> Result<()>;

    fn boxed(self) -> BoxedOperator
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

pub type BoxedOperator = Box<dyn Operator>;

impl<O: Operator + ?Sized> Operator for Box<O> {
    fn accept(&mut self, record: &Record) -> Result<()> {
        (**self).accept(record)
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        (**self).flush(ctx)
    }
}

pub type Predicate = Box<dyn Fn(&Record) -> Result<bool>>;
pub type Transform = Box<dyn Fn(&Record) -> Result<Record>>;
pub type Projection = Box<dyn Fn(&Record) -> Result<GroupKey>>;
pub type Fold = Box<dyn Fn(&Value, &Record) -> Result<Value>>;
/// Splits a record into its join key fields and the value fields it carries.
pub type Extractor = Box<dyn Fn(&Record) -> Result<(GroupKey, Record)>>;

/// Drop the record on a field-level error, propagate anything else.
pub(crate) fn reject(operator: &'static str, err: StreamError) -> Result<()> {
    if err.is_record_local() {
        debug!(operator, error = %err, "record rejected");
        Ok(())
    } else {
        Err(err)
    }
}
