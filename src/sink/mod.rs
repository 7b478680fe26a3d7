//! Terminal operators: where pipeline results end up.
//!
//! Every sink owns its writer and its formatting state; two sinks never share
//! a header flag or a counter.

mod csv;
mod dump;
mod json;
mod memory;
mod walts;

pub use self::csv::CsvSink;
pub use dump::DumpSink;
pub use json::JsonLinesSink;
pub use memory::{MemoryHandle, MemorySink, SinkEvent};
pub use walts::WaltsCsvSink;

use crate::config::OutputConfig;
use crate::error::Result;
use crate::operator::{BoxedOperator, Operator};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `"field" => value, ` lines
    #[default]
    Dump,
    /// Header from the first record, one row per record
    Csv,
    /// Seven fixed flow columns
    WaltsCsv,
    /// One JSON object per line
    JsonLines,
}

fn open_writer(config: &OutputConfig) -> Result<Box<dyn Write>> {
    Ok(match &config.path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Build the sink named by `config`, writing to its path or stdout.
pub fn build(config: &OutputConfig, epoch_field: &str) -> Result<BoxedOperator> {
    let out = open_writer(config)?;
    Ok(match config.format {
        OutputFormat::Dump => DumpSink::new(out, config.show_reset).boxed(),
        OutputFormat::Csv => {
            let mut sink = CsvSink::new(out).with_header(config.header);
            if let Some((name, value)) = &config.static_field {
                sink = sink.with_static_field(name.clone(), value.clone());
            }
            sink.boxed()
        }
        OutputFormat::WaltsCsv => WaltsCsvSink::new(out, epoch_field).boxed(),
        OutputFormat::JsonLines => JsonLinesSink::new(out, config.show_reset).boxed(),
    })
}
