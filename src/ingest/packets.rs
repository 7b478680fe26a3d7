//! Packet ingestion from JSON lines, e.g.
//! `{"time": 0.5, "ipv4.src": "10.0.0.1", "l4.dport": 22, "eth.src": "00:11:22:33:44:55"}`.
//!
//! Integers become `Int`, other numbers `Float`, strings an IPv4 address or a
//! MAC, `null` becomes `Empty`. Numbers under the time field are always
//! `Float`. Packets carry no epoch; the pipeline's windower assigns it.

use super::{malformed, IngestStats, MalformedPolicy};
use crate::error::Result;
use crate::operator::Operator;
use crate::record::{Record, Value};
use std::io::BufRead;
use std::net::Ipv4Addr;
use tracing::info;

pub struct PacketReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line: usize,
    time_field: String,
}

impl<R: BufRead> PacketReader<R> {
    pub fn new(input: R, time_field: impl Into<String>) -> Self {
        Self {
            lines: input.lines(),
            line: 0,
            time_field: time_field.into(),
        }
    }
}

impl<R: BufRead> Iterator for PacketReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(t) => t,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            return Some(parse_packet(&text, self.line, &self.time_field));
        }
    }
}

fn convert(name: &str, raw: &serde_json::Value, line: usize, time_field: &str) -> Result<Value> {
    use serde_json::Value as Json;
    match raw {
        Json::Null => Ok(Value::Empty),
        Json::Number(n) if name == time_field => n
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| malformed(line, format!("`{}` is not a number", name))),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| malformed(line, format!("`{}` is out of range", name))),
        },
        Json::String(s) => s
            .parse::<Ipv4Addr>()
            .map(Value::Ipv4)
            .ok()
            .or_else(|| Value::parse_mac(s))
            .ok_or_else(|| malformed(line, format!("`{}` is neither an IPv4 nor a MAC address", name))),
        other => Err(malformed(line, format!("`{}` has unsupported value {}", name, other))),
    }
}

/// Parse one JSON object line into a record.
pub fn parse_packet(text: &str, line: usize, time_field: &str) -> Result<Record> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(text).map_err(|e| malformed(line, e.to_string()))?;
    let mut record = Record::new();
    for (name, raw) in &object {
        record.insert(name.clone(), convert(name, raw, line, time_field)?);
    }
    Ok(record)
}

/// Push every packet into `op`, then issue one final flush with an empty context.
pub fn drive_packets<R: BufRead>(
    reader: PacketReader<R>,
    op: &mut dyn Operator,
    policy: MalformedPolicy,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    for packet in reader {
        stats.rows += 1;
        match packet {
            Ok(record) => {
                op.accept(&record)?;
                stats.accepted += 1;
            }
            Err(e) => policy.handle(e, &mut stats)?,
        }
    }
    op.flush(&Record::new())?;
    stats.flushes += 1;
    info!(
        rows = stats.rows,
        accepted = stats.accepted,
        skipped = stats.skipped,
        "packet input drained"
    );
    Ok(stats)
}
