//! Turning input files into records pushed through a pipeline.
//!
//! - [`walts`]: seven-column flow CSV whose rows already carry an epoch id
//! - [`packets`]: one JSON object per packet, timestamped but not epoched

pub mod packets;
pub mod walts;

pub use packets::{drive_packets, PacketReader};
pub use walts::{drive_all, drive_flows, WaltsReader, TUPLES};

use crate::error::{Result, StreamError};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum InputFormat {
    /// `src,dst,sport,dport,packet_count,byte_count,epoch` rows
    #[default]
    WaltsCsv,
    /// JSON object per line
    JsonLines,
}

/// What a driver does with a line it cannot parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Log a warning and move on
    #[default]
    Skip,
    /// Stop and return the error
    Abort,
}

/// Counters reported by a driver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Non-blank input lines read
    pub rows: u64,
    /// Records handed to the pipeline
    pub accepted: u64,
    /// Malformed lines skipped
    pub skipped: u64,
    /// Flushes issued by the driver
    pub flushes: u64,
}

impl MalformedPolicy {
    /// Apply the policy to a read error. `Ok(())` means the line was skipped.
    pub(crate) fn handle(self, err: StreamError, stats: &mut IngestStats) -> Result<()> {
        if self == MalformedPolicy::Skip {
            if let StreamError::MalformedInput { line, reason } = &err {
                warn!(line, %reason, "skipping malformed input line");
                stats.skipped += 1;
                return Ok(());
            }
        }
        Err(err)
    }
}

pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> StreamError {
    StreamError::MalformedInput {
        line,
        reason: reason.into(),
    }
}
