//! Detectors correlating several views of the same packet stream.
//!
//! Each view is windowed on its own and reduced per host before the views
//! meet in a join; a join only forwards an epoch's flush once both of its
//! inputs have moved past that epoch.

use super::{is_tcp, tcp_flags_eq, tcp_flags_set, DetectorConfig, ACK, FIN, SYN, SYN_ACK};
use crate::error::{Result, StreamError};
use crate::operator::{
    count, fields, join, key_geq_int, key_leq_int, sum_int, with_field, BoxedOperator, Distinct, Filter,
    GroupBy, Map, MissingPolicy, Operator,
};
use crate::record::{fields as f, GroupKey, Record, Value};

/// Join extractor: key fields renamed by `key`, values picked by `values`.
fn renamed_key(
    key: &'static [(&'static str, &'static str)],
    values: &'static [&'static str],
) -> impl Fn(&Record) -> Result<(GroupKey, Record)> {
    move |r: &Record| Ok((r.rename(key)?, r.select(values)))
}

/// Map step setting `out = op(a, b)` over two integer fields. Overflow
/// rejects the record.
fn combine(
    out: &'static str,
    a: &'static str,
    b: &'static str,
    op: fn(i64, i64) -> Option<i64>,
) -> impl Fn(&Record) -> Result<Record> {
    with_field(out, move |r: &Record| {
        op(r.int(a)?, r.int(b)?)
            .map(Value::Int)
            .ok_or_else(|| StreamError::Overflow { field: out.to_string() })
    })
}

/// One view: window, keep matching packets, count them per `group` under `out`.
fn counted_view(
    config: &DetectorConfig,
    predicate: impl Fn(&Record) -> Result<bool> + 'static,
    group: &'static str,
    out: &'static str,
    next: BoxedOperator,
) -> Result<BoxedOperator> {
    let counted = GroupBy::new(fields([group]), count(), out, next).boxed();
    config.head(Filter::new(predicate, counted).boxed())
}

/// Hosts where SYNs plus SYN-ACKs exceed ACKs by at least `threshold`.
///
/// Entries: SYN view, SYN-ACK view, ACK view.
pub(super) fn syn_flood(config: &DetectorConfig, next: BoxedOperator) -> Result<Vec<BoxedOperator>> {
    let alert = Filter::new(key_geq_int("syns+synacks-acks", config.threshold()), next).boxed();
    let diff = Map::new(
        combine("syns+synacks-acks", "syns+synacks", "acks", i64::checked_sub),
        alert,
    )
    .boxed();
    let (handshakes, acks) = join(
        config.epoch_field.clone(),
        renamed_key(&[("host", "host")], &["syns+synacks"]),
        renamed_key(&[(f::IPV4_DST, "host")], &["acks"]),
        diff,
    );

    let total = Map::new(
        combine("syns+synacks", "syns", "synacks", i64::checked_add),
        handshakes.boxed(),
    )
    .boxed();
    let (syns, synacks) = join(
        config.epoch_field.clone(),
        renamed_key(&[(f::IPV4_DST, "host")], &["syns"]),
        renamed_key(&[(f::IPV4_SRC, "host")], &["synacks"]),
        total,
    );

    Ok(vec![
        counted_view(config, tcp_flags_eq(SYN), f::IPV4_DST, "syns", syns.boxed())?,
        counted_view(config, tcp_flags_eq(SYN_ACK), f::IPV4_SRC, "synacks", synacks.boxed())?,
        counted_view(config, tcp_flags_eq(ACK), f::IPV4_DST, "acks", acks.boxed())?,
    ])
}

/// Hosts that received at least `threshold` more SYNs than they sent FINs.
///
/// Entries: SYN view, FIN view.
pub(super) fn completed_flows(config: &DetectorConfig, next: BoxedOperator) -> Result<Vec<BoxedOperator>> {
    let alert = Filter::new(key_geq_int("diff", config.threshold()), next).boxed();
    let diff = Map::new(combine("diff", "syns", "fins", i64::checked_sub), alert).boxed();
    let (syns, fins) = join(
        config.epoch_field.clone(),
        renamed_key(&[(f::IPV4_DST, "host")], &["syns"]),
        renamed_key(&[(f::IPV4_SRC, "host")], &["fins"]),
        diff,
    );
    Ok(vec![
        counted_view(config, tcp_flags_eq(SYN), f::IPV4_DST, "syns", syns.boxed())?,
        counted_view(config, tcp_flags_set(FIN), f::IPV4_SRC, "fins", fins.boxed())?,
    ])
}

/// Hosts with many connections that each carry few bytes.
///
/// Entries: connection-count view, byte-count view.
pub(super) fn slowloris(config: &DetectorConfig, next: BoxedOperator) -> Result<Vec<BoxedOperator>> {
    let params = config.slowloris;
    let alert = Filter::new(key_leq_int("bytes_per_conn", params.max_bytes_per_conn), next).boxed();
    // A zero connection count leaves the ratio Empty, which the filter rejects.
    let ratio = Map::new(
        with_field("bytes_per_conn", |r: &Record| {
            Ok(r.int("n_bytes")?
                .checked_div(r.int("n_conns")?)
                .map_or(Value::Empty, Value::Int))
        }),
        alert,
    )
    .boxed();
    let (conns, bytes) = join(
        config.epoch_field.clone(),
        renamed_key(&[(f::IPV4_DST, f::IPV4_DST)], &["n_conns"]),
        renamed_key(&[(f::IPV4_DST, f::IPV4_DST)], &["n_bytes"]),
        ratio,
    );

    let enough_conns = Filter::new(key_geq_int("n_conns", params.min_conns), conns.boxed()).boxed();
    let n_conns = GroupBy::new(fields([f::IPV4_DST]), count(), "n_conns", enough_conns).boxed();
    let per_conn = Distinct::new(fields([f::IPV4_SRC, f::IPV4_DST, f::L4_SPORT]), n_conns).boxed();
    let conn_view = config.head(Filter::new(is_tcp(), per_conn).boxed())?;

    let enough_bytes = Filter::new(key_geq_int("n_bytes", params.min_bytes), bytes.boxed()).boxed();
    let n_bytes = GroupBy::new(
        fields([f::IPV4_DST]),
        sum_int(f::IPV4_LEN, MissingPolicy::Reject),
        "n_bytes",
        enough_bytes,
    )
    .boxed();
    let byte_view = config.head(Filter::new(is_tcp(), n_bytes).boxed())?;

    Ok(vec![conn_view, byte_view])
}

/// Raw SYN packets matched with SYN-ACKs sent back by their source host.
///
/// Entries: SYN view, SYN-ACK view.
pub(super) fn join_test(config: &DetectorConfig, next: BoxedOperator) -> Result<Vec<BoxedOperator>> {
    let time_field = config.time_field.clone();
    let (syns, synacks) = join(
        config.epoch_field.clone(),
        |r: &Record| -> Result<(GroupKey, Record)> {
            Ok((r.rename(&[(f::IPV4_SRC, "host")])?, r.rename(&[(f::IPV4_DST, "remote")])?.into_record()))
        },
        move |r: &Record| -> Result<(GroupKey, Record)> {
            Ok((r.rename(&[(f::IPV4_DST, "host")])?, r.select(&[time_field.as_str()])))
        },
        next,
    );
    Ok(vec![
        config.head(Filter::new(tcp_flags_eq(SYN), syns.boxed()).boxed())?,
        config.head(Filter::new(tcp_flags_eq(SYN_ACK), synacks.boxed()).boxed())?,
    ])
}
