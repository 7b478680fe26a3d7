//! Human-readable dump: one `"field" => value, ` line per record.

use crate::error::Result;
use crate::operator::Operator;
use crate::record::Record;
use std::io::Write;

pub struct DumpSink<W: Write> {
    out: W,
    show_reset: bool,
}

impl<W: Write> DumpSink<W> {
    /// With `show_reset`, each flush prints its context followed by `[reset]`.
    pub fn new(out: W, show_reset: bool) -> Self {
        Self { out, show_reset }
    }

    pub fn into_writer(self) -> W {
        self.out
    }
}

impl<W: Write> Operator for DumpSink<W> {
    fn accept(&mut self, record: &Record) -> Result<()> {
        writeln!(self.out, "{}", record)?;
        Ok(())
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        if self.show_reset {
            writeln!(self.out, "{}", ctx)?;
            writeln!(self.out, "[reset]")?;
        }
        self.out.flush()?;
        Ok(())
    }
}
