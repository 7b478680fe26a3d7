//! Field names used by the ingestion formats and detectors.

pub const TIME: &str = "time";
pub const ETH_SRC: &str = "eth.src";
pub const ETH_DST: &str = "eth.dst";
pub const IPV4_PROTO: &str = "ipv4.proto";
pub const IPV4_LEN: &str = "ipv4.len";
pub const IPV4_SRC: &str = "ipv4.src";
pub const IPV4_DST: &str = "ipv4.dst";
pub const L4_SPORT: &str = "l4.sport";
pub const L4_DPORT: &str = "l4.dport";
pub const L4_FLAGS: &str = "l4.flags";
pub const PACKET_COUNT: &str = "packet_count";
pub const BYTE_COUNT: &str = "byte_count";

/// Default name of the epoch id field.
pub const EPOCH: &str = "eid";
