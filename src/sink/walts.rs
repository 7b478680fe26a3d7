//! Fixed seven-column CSV in the layout the flow ingester reads back.

use crate::error::Result;
use crate::operator::Operator;
use crate::record::{fields, Record};
use std::io::Write;
use tracing::warn;

const COLUMNS: [&str; 6] = [
    fields::IPV4_SRC,
    fields::IPV4_DST,
    fields::L4_SPORT,
    fields::L4_DPORT,
    fields::PACKET_COUNT,
    fields::BYTE_COUNT,
];

/// Writes `src,dst,sport,dport,packet_count,byte_count,epoch` rows. A record
/// missing one of the columns is skipped with a warning.
pub struct WaltsCsvSink<W: Write> {
    out: csv::Writer<W>,
    epoch_field: String,
    skipped: u64,
}

impl<W: Write> WaltsCsvSink<W> {
    pub fn new(out: W, epoch_field: impl Into<String>) -> Self {
        Self {
            out: csv::WriterBuilder::new().has_headers(false).from_writer(out),
            epoch_field: epoch_field.into(),
            skipped: 0,
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Flush buffered rows and hand back the underlying writer.
    pub fn into_writer(self) -> Result<W> {
        Ok(self.out.into_inner()?)
    }
}

impl<W: Write> Operator for WaltsCsvSink<W> {
    fn accept(&mut self, record: &Record) -> Result<()> {
        let mut cells = Vec::with_capacity(COLUMNS.len() + 1);
        for name in COLUMNS.iter().copied().chain([self.epoch_field.as_str()]) {
            match record.get(name) {
                Some(v) => cells.push(v.to_string()),
                None => {
                    self.skipped += 1;
                    warn!(field = name, "record lacks a flow column, not written");
                    return Ok(());
                }
            }
        }
        self.out.write_record(&cells)?;
        Ok(())
    }

    fn flush(&mut self, _ctx: &Record) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
