//! Detectors over a single packet stream.

use super::{tcp_flags_eq, DetectorConfig};
use crate::error::Result;
use crate::operator::{
    count, fields, key_geq_int, single_group, BoxedOperator, Distinct, Filter, GroupBy, Map, Operator,
};
use crate::record::{fields as f, Record};

pub(super) fn ident(next: BoxedOperator) -> BoxedOperator {
    Map::new(
        |r: &Record| {
            Ok(r.iter()
                .filter(|(name, _)| *name != f::ETH_SRC && *name != f::ETH_DST)
                .map(|(name, v)| (name, *v))
                .collect())
        },
        next,
    )
    .boxed()
}

pub(super) fn count_pkts(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    config.head(GroupBy::new(single_group(), count(), "pkts", next).boxed())
}

pub(super) fn pkts_per_src_dst(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    config.head(GroupBy::new(fields([f::IPV4_SRC, f::IPV4_DST]), count(), "pkts", next).boxed())
}

pub(super) fn distinct_srcs(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    let srcs = GroupBy::new(single_group(), count(), "srcs", next).boxed();
    config.head(Distinct::new(fields([f::IPV4_SRC]), srcs).boxed())
}

/// Destinations receiving at least `threshold` SYNs per epoch.
pub(super) fn tcp_new_cons(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    let alert = Filter::new(key_geq_int("cons", config.threshold()), next).boxed();
    let cons = GroupBy::new(fields([f::IPV4_DST]), count(), "cons", alert).boxed();
    config.head(Filter::new(tcp_flags_eq(super::SYN), cons).boxed())
}

/// Destinations reached on port 22 by at least `threshold` sources sending
/// packets of one size.
pub(super) fn ssh_brute_force(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    let alert = Filter::new(key_geq_int("srcs", config.threshold()), next).boxed();
    let srcs = GroupBy::new(fields([f::IPV4_DST, f::IPV4_LEN]), count(), "srcs", alert).boxed();
    let dedup = Distinct::new(fields([f::IPV4_SRC, f::IPV4_DST, f::IPV4_LEN]), srcs).boxed();
    let ssh = |r: &Record| -> Result<bool> { Ok(r.int(f::IPV4_PROTO)? == super::TCP && r.int(f::L4_DPORT)? == 22) };
    config.head(Filter::new(ssh, dedup).boxed())
}

pub(super) fn super_spreader(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    let alert = Filter::new(key_geq_int("dsts", config.threshold()), next).boxed();
    let dsts = GroupBy::new(fields([f::IPV4_SRC]), count(), "dsts", alert).boxed();
    config.head(Distinct::new(fields([f::IPV4_SRC, f::IPV4_DST]), dsts).boxed())
}

pub(super) fn port_scan(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    let alert = Filter::new(key_geq_int("ports", config.threshold()), next).boxed();
    let ports = GroupBy::new(fields([f::IPV4_SRC]), count(), "ports", alert).boxed();
    config.head(Distinct::new(fields([f::IPV4_SRC, f::L4_DPORT]), ports).boxed())
}

/// Destinations contacted by at least `threshold` distinct sources.
pub(super) fn ddos(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    let alert = Filter::new(key_geq_int("srcs", config.threshold()), next).boxed();
    let srcs = GroupBy::new(fields([f::IPV4_DST]), count(), "srcs", alert).boxed();
    config.head(Distinct::new(fields([f::IPV4_SRC, f::IPV4_DST]), srcs).boxed())
}

pub(super) fn distinct_pairs(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    config.head(Distinct::new(fields([f::IPV4_SRC, f::IPV4_DST]), next).boxed())
}

pub(super) fn pkts_per_dst(config: &DetectorConfig, next: BoxedOperator) -> Result<BoxedOperator> {
    config.head(GroupBy::new(fields([f::IPV4_DST]), count(), "pkts", next).boxed())
}
