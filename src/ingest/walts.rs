//! Flow CSV ingestion. Rows are pre-aggregated flows already tagged with an
//! epoch id, so the driver issues the epoch flushes itself.

use super::{malformed, IngestStats, MalformedPolicy};
use crate::error::{Result, StreamError};
use crate::operator::{BoxedOperator, Operator};
use crate::record::{fields, Record, Value};
use csv::StringRecord;
use std::io::Read;
use std::net::Ipv4Addr;
use tracing::{debug, info};

const COLUMNS: usize = 7;

/// Iterator over the records of a flow CSV. Blank lines are ignored.
pub struct WaltsReader<R: Read> {
    rows: csv::Reader<R>,
    row: StringRecord,
    epoch_field: String,
}

impl<R: Read> WaltsReader<R> {
    pub fn new(input: R, epoch_field: impl Into<String>) -> Self {
        let rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);
        Self {
            rows,
            row: StringRecord::new(),
            epoch_field: epoch_field.into(),
        }
    }

    pub fn epoch_field(&self) -> &str {
        &self.epoch_field
    }

    fn line(&self) -> usize {
        self.rows.position().line() as usize
    }
}

/// Turn a reader error into `Io` or a `MalformedInput` at its line.
fn read_error(err: csv::Error, fallback_line: usize) -> StreamError {
    let line = err.position().map_or(fallback_line, |p| p.line() as usize);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => StreamError::Io(e),
        _ => malformed(line, reason),
    }
}

impl<R: Read> Iterator for WaltsReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rows.read_record(&mut self.row) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(read_error(e, self.line()))),
            }
            // A whitespace-only line trims down to one empty cell.
            if self.row.len() == 1 && self.row[0].is_empty() {
                continue;
            }
            let line = self.row.position().map_or_else(|| self.line(), |p| p.line() as usize);
            return Some(parse_row(&self.row, line, &self.epoch_field));
        }
    }
}

fn parse_address(cell: &str, line: usize) -> Result<Value> {
    if cell == "0" {
        return Ok(Value::Int(0));
    }
    cell.parse::<Ipv4Addr>()
        .map(Value::Ipv4)
        .map_err(|_| malformed(line, format!("bad address `{}`", cell)))
}

fn parse_int(cell: &str, line: usize, column: &str) -> Result<Value> {
    cell.parse::<i64>()
        .map(Value::Int)
        .map_err(|_| malformed(line, format!("bad integer `{}` in {}", cell, column)))
}

/// Parse one `src,dst,sport,dport,packet_count,byte_count,epoch` row.
pub fn parse_row(cells: &StringRecord, line: usize, epoch_field: &str) -> Result<Record> {
    if cells.len() != COLUMNS {
        return Err(malformed(
            line,
            format!("expected {} columns, found {}", COLUMNS, cells.len()),
        ));
    }
    Ok(Record::from([
        (fields::IPV4_SRC, parse_address(&cells[0], line)?),
        (fields::IPV4_DST, parse_address(&cells[1], line)?),
        (fields::L4_SPORT, parse_int(&cells[2], line, fields::L4_SPORT)?),
        (fields::L4_DPORT, parse_int(&cells[3], line, fields::L4_DPORT)?),
        (fields::PACKET_COUNT, parse_int(&cells[4], line, fields::PACKET_COUNT)?),
        (fields::BYTE_COUNT, parse_int(&cells[5], line, fields::BYTE_COUNT)?),
        (epoch_field, parse_int(&cells[6], line, epoch_field)?),
    ]))
}

/// Field carrying the number of rows an epoch received, set on every flush
/// context the flow drivers send.
pub const TUPLES: &str = "tuples";

/// Epoch bookkeeping for one stamped source feeding one operator.
struct EpochCursor {
    field: String,
    current: i64,
    tuples: i64,
}

impl EpochCursor {
    fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            current: 0,
            tuples: 0,
        }
    }

    /// Close the current epoch and move to the next one.
    fn close(&mut self, op: &mut dyn Operator, stats: &mut IngestStats) -> Result<()> {
        let ctx = Record::from([
            (self.field.as_str(), Value::Int(self.current)),
            (TUPLES, Value::Int(self.tuples)),
        ]);
        op.flush(&ctx)?;
        stats.flushes += 1;
        self.current += 1;
        self.tuples = 0;
        Ok(())
    }

    /// Flush every epoch below `record`'s, then hand the record over.
    fn push(&mut self, record: &Record, op: &mut dyn Operator, stats: &mut IngestStats) -> Result<()> {
        let epoch = record.int(&self.field).map_err(|e| {
            StreamError::InvariantViolation(format!("stamped input without epoch: {}", e))
        })?;
        if epoch < self.current {
            debug!(epoch, current = self.current, "row from an already flushed epoch");
        }
        while epoch > self.current {
            self.close(op, stats)?;
        }
        op.accept(record)?;
        self.tuples += 1;
        stats.accepted += 1;
        Ok(())
    }

    /// End of input: close the last epoch, then flush the one after it so a
    /// join downstream sees both of its inputs move past the last epoch.
    fn finish(&mut self, op: &mut dyn Operator, stats: &mut IngestStats) -> Result<()> {
        self.close(op, stats)?;
        self.close(op, stats)
    }
}

/// Push every row of `reader` into `op`, flushing at each epoch change and
/// twice at end of input (the last epoch, then the one after it).
pub fn drive_flows<R: Read>(
    reader: WaltsReader<R>,
    op: &mut dyn Operator,
    policy: MalformedPolicy,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    let mut cursor = EpochCursor::new(reader.epoch_field());
    for row in reader {
        stats.rows += 1;
        match row {
            Ok(record) => cursor.push(&record, op, &mut stats)?,
            Err(e) => policy.handle(e, &mut stats)?,
        }
    }
    cursor.finish(op, &mut stats)?;
    info!(
        rows = stats.rows,
        accepted = stats.accepted,
        skipped = stats.skipped,
        flushes = stats.flushes,
        "flow input drained"
    );
    Ok(stats)
}

struct Source<R: Read> {
    reader: WaltsReader<R>,
    cursor: EpochCursor,
    active: bool,
}

/// Round-robin several flow sources, source `i` feeding `operators[i]`.
///
/// Each round takes one row from every source still open. A source that
/// reaches end of input gets its final flushes and drops out.
pub fn drive_all<R: Read>(
    readers: Vec<WaltsReader<R>>,
    operators: &mut [BoxedOperator],
    policy: MalformedPolicy,
) -> Result<IngestStats> {
    if readers.len() != operators.len() {
        return Err(StreamError::InvariantViolation(format!(
            "{} sources for {} operators",
            readers.len(),
            operators.len()
        )));
    }
    let mut sources: Vec<Source<R>> = readers
        .into_iter()
        .map(|reader| Source {
            cursor: EpochCursor::new(reader.epoch_field()),
            reader,
            active: true,
        })
        .collect();

    let mut stats = IngestStats::default();
    while sources.iter().any(|s| s.active) {
        for (source, op) in sources.iter_mut().zip(operators.iter_mut()) {
            if !source.active {
                continue;
            }
            match source.reader.next() {
                Some(Ok(record)) => {
                    stats.rows += 1;
                    source.cursor.push(&record, op.as_mut(), &mut stats)?;
                }
                Some(Err(e)) => {
                    stats.rows += 1;
                    policy.handle(e, &mut stats)?;
                }
                None => {
                    source.cursor.finish(op.as_mut(), &mut stats)?;
                    source.active = false;
                }
            }
        }
    }
    info!(
        sources = operators.len(),
        rows = stats.rows,
        accepted = stats.accepted,
        flushes = stats.flushes,
        "all flow sources drained"
    );
    Ok(stats)
}
