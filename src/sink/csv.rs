//! Tabular CSV dump. The header comes from the first record's field names.

use crate::error::Result;
use crate::operator::Operator;
use crate::record::Record;
use std::io::Write;

pub struct CsvSink<W: Write> {
    out: csv::Writer<W>,
    static_field: Option<(String, String)>,
    header_pending: bool,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: csv::WriterBuilder::new().has_headers(false).from_writer(out),
            static_field: None,
            header_pending: true,
        }
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header_pending = header;
        self
    }

    /// Prefix every row with a constant column.
    pub fn with_static_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_field = Some((name.into(), value.into()));
        self
    }

    /// Flush buffered rows and hand back the underlying writer.
    pub fn into_writer(self) -> Result<W> {
        Ok(self.out.into_inner()?)
    }
}

impl<W: Write> Operator for CsvSink<W> {
    fn accept(&mut self, record: &Record) -> Result<()> {
        let prefix = self.static_field.as_ref();
        if self.header_pending {
            self.header_pending = false;
            let names = prefix.map(|(name, _)| name.as_str()).into_iter().chain(record.names());
            self.out.write_record(names)?;
        }
        let cells = prefix
            .map(|(_, value)| value.clone())
            .into_iter()
            .chain(record.iter().map(|(_, v)| v.to_string()));
        self.out.write_record(cells)?;
        Ok(())
    }

    fn flush(&mut self, _ctx: &Record) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
