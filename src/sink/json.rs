//! One JSON object per record (ndjson).

use crate::error::Result;
use crate::logging::StructuredLogger;
use crate::operator::Operator;
use crate::record::Record;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Reset<'a> {
    reset: &'a Record,
}

pub struct JsonLinesSink<W: Write> {
    out: W,
    show_reset: bool,
}

impl<W: Write> JsonLinesSink<W> {
    /// With `show_reset`, each flush writes `{"reset": ctx}`.
    pub fn new(out: W, show_reset: bool) -> Self {
        Self { out, show_reset }
    }

    pub fn into_writer(self) -> W {
        self.out
    }
}

impl<W: Write> Operator for JsonLinesSink<W> {
    fn accept(&mut self, record: &Record) -> Result<()> {
        StructuredLogger::emit_json(record, &mut self.out)?;
        Ok(())
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        if self.show_reset {
            StructuredLogger::emit_json(&Reset { reset: ctx }, &mut self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }
}
