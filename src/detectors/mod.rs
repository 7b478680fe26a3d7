//! Named detector compositions.
//!
//! A detector is fixed wiring of the core operators. [`build`] turns a
//! [`DetectorConfig`] into one entry operator per input stream; detectors that
//! correlate several views of the traffic (SYN flood, slowloris, ...) have one
//! entry per view, each expecting the full packet stream.

mod joined;
mod single;

use crate::error::Result;
use crate::operator::{BoxedOperator, Epoch, Operator, Split};
use crate::record::{fields, Record};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const TCP: i64 = 6;
pub const SYN: i64 = 2;
pub const ACK: i64 = 16;
pub const SYN_ACK: i64 = 18;
pub const FIN: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Pass packets through without their Ethernet addresses
    Ident,
    /// Packets per epoch
    CountPkts,
    /// Packets per (source, destination) pair
    PktsPerSrcDst,
    /// Distinct sources per epoch
    DistinctSrcs,
    /// Destinations receiving many new TCP connections
    TcpNewCons,
    /// Many sources hitting port 22 of one destination with same-size packets
    SshBruteForce,
    /// Sources contacting many distinct destinations
    SuperSpreader,
    /// Sources probing many distinct ports
    PortScan,
    /// Destinations contacted by many distinct sources
    #[default]
    Ddos,
    /// Hosts with many half-open handshakes
    SynFlood,
    /// Hosts where opened connections outnumber closed ones
    CompletedFlows,
    /// Hosts holding many low-volume connections
    Slowloris,
    /// Raw SYN / SYN-ACK correlation
    JoinTest,
    /// Distinct (source, destination) pairs over long epochs
    DistinctPairs,
    /// Packets per destination over very long epochs
    PktsPerDst,
}

impl DetectorKind {
    pub fn name(self) -> &'static str {
        match self {
            DetectorKind::Ident => "ident",
            DetectorKind::CountPkts => "count_pkts",
            DetectorKind::PktsPerSrcDst => "pkts_per_src_dst",
            DetectorKind::DistinctSrcs => "distinct_srcs",
            DetectorKind::TcpNewCons => "tcp_new_cons",
            DetectorKind::SshBruteForce => "ssh_brute_force",
            DetectorKind::SuperSpreader => "super_spreader",
            DetectorKind::PortScan => "port_scan",
            DetectorKind::Ddos => "ddos",
            DetectorKind::SynFlood => "syn_flood",
            DetectorKind::CompletedFlows => "completed_flows",
            DetectorKind::Slowloris => "slowloris",
            DetectorKind::JoinTest => "join_test",
            DetectorKind::DistinctPairs => "distinct_pairs",
            DetectorKind::PktsPerDst => "pkts_per_dst",
        }
    }

    pub fn default_threshold(self) -> i64 {
        match self {
            DetectorKind::TcpNewCons
            | DetectorKind::SshBruteForce
            | DetectorKind::SuperSpreader
            | DetectorKind::PortScan => 40,
            DetectorKind::Ddos => 45,
            DetectorKind::SynFlood => 3,
            DetectorKind::CompletedFlows => 1,
            _ => 0,
        }
    }

    /// Epoch width in time units when the detector windows its own input.
    pub fn default_epoch_width(self) -> f64 {
        match self {
            DetectorKind::CompletedFlows => 30.0,
            DetectorKind::DistinctPairs => 100.0,
            DetectorKind::PktsPerDst => 10000.0,
            _ => 1.0,
        }
    }
}

/// How a detector's input gets its epoch ids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Epoching {
    /// Window the time field into epochs of `width`
    Windowed { width: f64 },
    /// Records already carry the epoch field; the driver issues flushes
    Stamped,
}

/// Slowloris thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowlorisParams {
    /// Minimum distinct connections to a host
    pub min_conns: i64,
    /// Minimum bytes sent to a host
    pub min_bytes: i64,
    /// Maximum bytes per connection still considered slow
    pub max_bytes_per_conn: i64,
}

impl Default for SlowlorisParams {
    fn default() -> Self {
        Self {
            min_conns: 5,
            min_bytes: 500,
            max_bytes_per_conn: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    /// Overrides the detector's default threshold
    pub threshold: Option<i64>,
    /// Overrides windowing with the detector's default width
    pub epoch: Option<Epoching>,
    pub time_field: String,
    pub epoch_field: String,
    pub slowloris: SlowlorisParams,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new(DetectorKind::default())
    }
}

impl DetectorConfig {
    pub fn new(kind: DetectorKind) -> Self {
        Self {
            kind,
            threshold: None,
            epoch: None,
            time_field: fields::TIME.to_string(),
            epoch_field: fields::EPOCH.to_string(),
            slowloris: SlowlorisParams::default(),
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold.unwrap_or_else(|| self.kind.default_threshold())
    }

    pub fn epoching(&self) -> Epoching {
        self.epoch.unwrap_or(Epoching::Windowed {
            width: self.kind.default_epoch_width(),
        })
    }

    /// Prepend the windower unless the input is already stamped.
    fn head(&self, next: BoxedOperator) -> Result<BoxedOperator> {
        match self.epoching() {
            Epoching::Windowed { width } => {
                Ok(Epoch::new(width, self.time_field.clone(), self.epoch_field.clone(), next)?.boxed())
            }
            Epoching::Stamped => Ok(next),
        }
    }
}

/// A built detector: one entry operator per input view.
pub struct Detector {
    kind: DetectorKind,
    entries: Vec<BoxedOperator>,
}

impl Detector {
    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    pub fn entries_mut(&mut self) -> &mut [BoxedOperator] {
        &mut self.entries
    }

    pub fn into_entries(self) -> Vec<BoxedOperator> {
        self.entries
    }

    /// Single operator feeding every entry the same stream.
    pub fn into_single(self) -> BoxedOperator {
        Split::fan_out(self.entries)
    }
}

/// Wire the detector described by `config` in front of `next`.
pub fn build(config: &DetectorConfig, next: BoxedOperator) -> Result<Detector> {
    let entries = match config.kind {
        DetectorKind::Ident => vec![single::ident(next)],
        DetectorKind::CountPkts => vec![single::count_pkts(config, next)?],
        DetectorKind::PktsPerSrcDst => vec![single::pkts_per_src_dst(config, next)?],
        DetectorKind::DistinctSrcs => vec![single::distinct_srcs(config, next)?],
        DetectorKind::TcpNewCons => vec![single::tcp_new_cons(config, next)?],
        DetectorKind::SshBruteForce => vec![single::ssh_brute_force(config, next)?],
        DetectorKind::SuperSpreader => vec![single::super_spreader(config, next)?],
        DetectorKind::PortScan => vec![single::port_scan(config, next)?],
        DetectorKind::Ddos => vec![single::ddos(config, next)?],
        DetectorKind::DistinctPairs => vec![single::distinct_pairs(config, next)?],
        DetectorKind::PktsPerDst => vec![single::pkts_per_dst(config, next)?],
        DetectorKind::SynFlood => joined::syn_flood(config, next)?,
        DetectorKind::CompletedFlows => joined::completed_flows(config, next)?,
        DetectorKind::Slowloris => joined::slowloris(config, next)?,
        DetectorKind::JoinTest => joined::join_test(config, next)?,
    };
    info!(
        detector = config.kind.name(),
        entries = entries.len(),
        threshold = config.threshold(),
        epoching = ?config.epoching(),
        "detector built"
    );
    Ok(Detector {
        kind: config.kind,
        entries,
    })
}

/// TCP packet whose flags field equals `flags` exactly.
pub fn tcp_flags_eq(flags: i64) -> impl Fn(&Record) -> Result<bool> {
    move |r: &Record| Ok(r.int(fields::IPV4_PROTO)? == TCP && r.int(fields::L4_FLAGS)? == flags)
}

/// TCP packet with every bit of `mask` set.
pub fn tcp_flags_set(mask: i64) -> impl Fn(&Record) -> Result<bool> {
    move |r: &Record| Ok(r.int(fields::IPV4_PROTO)? == TCP && r.int(fields::L4_FLAGS)? & mask == mask)
}

pub fn is_tcp() -> impl Fn(&Record) -> Result<bool> {
    |r: &Record| Ok(r.int(fields::IPV4_PROTO)? == TCP)
}
