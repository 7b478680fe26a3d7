//! Per-epoch throughput meter.

use super::{BoxedOperator, Operator};
use crate::error::Result;
use crate::record::Record;
use std::io::Write;

/// Pass-through operator that counts records per epoch and, on each flush,
/// writes `epoch_index,name,count,static` to its own writer.
pub struct MetaMeter<W: Write> {
    name: String,
    out: csv::Writer<W>,
    static_field: String,
    epoch: u64,
    records: u64,
    next: BoxedOperator,
}

impl<W: Write> MetaMeter<W> {
    pub fn new(name: impl Into<String>, out: W, static_field: Option<String>, next: BoxedOperator) -> Self {
        Self {
            name: name.into(),
            out: csv::WriterBuilder::new().has_headers(false).from_writer(out),
            static_field: static_field.unwrap_or_default(),
            epoch: 0,
            records: 0,
            next,
        }
    }

    pub fn into_writer(self) -> Result<W> {
        Ok(self.out.into_inner()?)
    }
}

impl<W: Write> Operator for MetaMeter<W> {
    fn accept(&mut self, record: &Record) -> Result<()> {
        self.records += 1;
        self.next.accept(record)
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        self.out.write_record([
            self.epoch.to_string().as_str(),
            self.name.as_str(),
            self.records.to_string().as_str(),
            self.static_field.as_str(),
        ])?;
        self.out.flush()?;
        self.records = 0;
        self.epoch += 1;
        self.next.flush(ctx)
    }
}
