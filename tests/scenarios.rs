//! End-to-end behavior of operator compositions, observed through a memory sink.

use flowscope::ingest::{drive_all, MalformedPolicy, WaltsReader};
use flowscope::operator::{
    count, fields, join, key_geq_int, single_group, sum_int, with_field, BoxedOperator, Distinct, Epoch, Filter,
    GroupBy, Map, MissingPolicy, Operator,
};
use flowscope::record::{fields as f, GroupKey, Record, Value};
use flowscope::sink::MemorySink;
use flowscope::Result;
use std::fmt::Write as _;
use std::io::Cursor;
use std::net::Ipv4Addr;

fn ctx(eid: i64) -> Record {
    Record::singleton(f::EPOCH, Value::Int(eid))
}

fn flow(src: Ipv4Addr, dst: Ipv4Addr, eid: i64) -> Record {
    Record::from([
        (f::IPV4_SRC, Value::Ipv4(src)),
        (f::IPV4_DST, Value::Ipv4(dst)),
        (f::EPOCH, Value::Int(eid)),
    ])
}

#[test]
fn ddos_reports_one_destination() {
    let victim = Ipv4Addr::new(203, 0, 113, 7);
    let (sink, seen) = MemorySink::new();
    let alert = Filter::new(key_geq_int("srcs", 45), sink.boxed()).boxed();
    let srcs = GroupBy::new(fields([f::IPV4_DST]), count(), "srcs", alert).boxed();
    let mut pipeline = Distinct::new(fields([f::IPV4_SRC, f::IPV4_DST]), srcs);

    // 50 records from 46 distinct sources
    for i in 0..50u8 {
        pipeline.accept(&flow(Ipv4Addr::new(10, 0, 0, i % 46), victim, 0)).unwrap();
    }
    pipeline.flush(&ctx(0)).unwrap();

    assert_eq!(
        seen.records(),
        vec![Record::from([
            (f::IPV4_DST, Value::Ipv4(victim)),
            ("srcs", Value::Int(46)),
            (f::EPOCH, Value::Int(0)),
        ])]
    );
}

fn host_counts(field: &'static str) -> impl Fn(&Record) -> Result<(GroupKey, Record)> {
    move |r: &Record| Ok((r.project(&["host"])?, r.select(&[field])))
}

#[test]
fn syn_flood_join_computes_unanswered_handshakes() {
    let (sink, seen) = MemorySink::new();
    let alert = Filter::new(key_geq_int("syns+synacks-acks", 3), sink.boxed()).boxed();
    let diff = Map::new(
        with_field("syns+synacks-acks", |r: &Record| {
            Ok(Value::Int(r.int("syns+synacks")? - r.int("acks")?))
        }),
        alert,
    )
    .boxed();
    let (mut handshakes, mut acks) = join(f::EPOCH, host_counts("syns+synacks"), host_counts("acks"), diff);

    let host = Value::Ipv4(Ipv4Addr::new(192, 168, 0, 1));
    let at = |name: &str, n: i64| {
        Record::from([("host", host), (name, Value::Int(n)), (f::EPOCH, Value::Int(0))])
    };
    handshakes.accept(&at("syns+synacks", 5 + 2)).unwrap();
    acks.accept(&at("acks", 1)).unwrap();

    let out = seen.records();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get("host"), Some(&host));
    assert_eq!(out[0].int("syns+synacks-acks").unwrap(), 6);
}

fn renamed_host(from: &'static str, value: &'static str) -> impl Fn(&Record) -> Result<(GroupKey, Record)> {
    move |r: &Record| Ok((r.rename(&[(from, "host")])?, r.select(&[value])))
}

fn counted_per(group: &'static str, out: &'static str, next: BoxedOperator) -> BoxedOperator {
    GroupBy::new(fields([group]), count(), out, next).boxed()
}

fn flow_rows(rows: &[(&str, &str)]) -> WaltsReader<Cursor<Vec<u8>>> {
    let mut text = String::new();
    for (src, dst) in rows {
        writeln!(text, "{},{},1000,80,1,40,0", src, dst).unwrap();
    }
    WaltsReader::new(Cursor::new(text.into_bytes()), f::EPOCH)
}

#[test]
fn stamped_syn_flood_from_raw_flow_rows() {
    let (sink, seen) = MemorySink::new();
    let alert = Filter::new(key_geq_int("syns+synacks-acks", 3), sink.boxed()).boxed();
    let diff = Map::new(
        with_field("syns+synacks-acks", |r: &Record| {
            Ok(Value::Int(r.int("syns+synacks")? - r.int("acks")?))
        }),
        alert,
    )
    .boxed();
    let (handshakes, acks) = join(
        f::EPOCH,
        renamed_host("host", "syns+synacks"),
        renamed_host(f::IPV4_DST, "acks"),
        diff,
    );
    let total = Map::new(
        with_field("syns+synacks", |r: &Record| {
            Ok(Value::Int(r.int("syns")? + r.int("synacks")?))
        }),
        handshakes.boxed(),
    )
    .boxed();
    let (syns, synacks) = join(
        f::EPOCH,
        renamed_host(f::IPV4_DST, "syns"),
        renamed_host(f::IPV4_SRC, "synacks"),
        total,
    );
    let mut views = vec![
        counted_per(f::IPV4_DST, "syns", syns.boxed()),
        counted_per(f::IPV4_SRC, "synacks", synacks.boxed()),
        counted_per(f::IPV4_DST, "acks", acks.boxed()),
    ];

    // One raw flow row per handshake packet.
    let host = "192.168.0.1";
    let clients = ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"];
    let syn_rows: Vec<(&str, &str)> = clients.iter().map(|c| (*c, host)).collect();
    let synack_rows: Vec<(&str, &str)> = clients[..2].iter().map(|c| (host, *c)).collect();
    let readers = vec![
        flow_rows(&syn_rows),
        flow_rows(&synack_rows),
        flow_rows(&[(clients[0], host)]),
    ];
    let stats = drive_all(readers, &mut views, MalformedPolicy::Abort).unwrap();
    assert_eq!(stats.accepted, 8);

    let out = seen.records();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].ipv4("host").unwrap(), Ipv4Addr::new(192, 168, 0, 1));
    assert_eq!(out[0].int("syns+synacks-acks").unwrap(), 6);
    assert_eq!(out[0].int(f::EPOCH).unwrap(), 0);
}

#[test]
fn overflowing_lengths_only_lose_their_own_record() {
    let (sink, seen) = MemorySink::new();
    let mut summed = GroupBy::new(
        fields([f::IPV4_DST]),
        sum_int(f::IPV4_LEN, MissingPolicy::Reject),
        "bytes",
        sink.boxed(),
    );
    let pkt = |dst: i64, len: i64| Record::from([(f::IPV4_DST, Value::Int(dst)), (f::IPV4_LEN, Value::Int(len))]);
    for r in [pkt(1, i64::MAX), pkt(2, 40), pkt(1, i64::MAX), pkt(2, 60)] {
        summed.accept(&r).unwrap();
    }
    summed.flush(&ctx(0)).unwrap();

    let totals: Vec<(i64, i64)> = seen
        .records()
        .iter()
        .map(|r| (r.int(f::IPV4_DST).unwrap(), r.int("bytes").unwrap()))
        .collect();
    assert_eq!(totals, vec![(1, i64::MAX), (2, 100)]);
}

#[test]
fn epoch_ids_never_decrease() {
    let (sink, seen) = MemorySink::new();
    let mut epoch = Epoch::new(0.5, f::TIME, f::EPOCH, sink.boxed()).unwrap();
    for t in [0.0, 0.1, 0.7, 0.7, 2.3, 2.4, 9.0] {
        epoch.accept(&Record::singleton(f::TIME, Value::Float(t))).unwrap();
    }
    let eids: Vec<i64> = seen.records().iter().map(|r| r.int(f::EPOCH).unwrap()).collect();
    assert!(eids.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(eids, vec![0, 0, 1, 1, 4, 4, 18]);

    // Each flushed epoch id appears once and in order.
    let flushed: Vec<i64> = seen.flushes().iter().map(|r| r.int(f::EPOCH).unwrap()).collect();
    assert_eq!(flushed, (0..18).collect::<Vec<_>>());
}

#[test]
fn counts_and_sums_cover_every_record() {
    let (sink, seen) = MemorySink::new();
    let mut counted = GroupBy::new(single_group(), count(), "n", sink.boxed());
    let (sink, summed_seen) = MemorySink::new();
    let mut summed = GroupBy::new(
        fields([f::IPV4_DST]),
        sum_int(f::IPV4_LEN, MissingPolicy::Reject),
        "bytes",
        sink.boxed(),
    );

    let lens = [40, 1500, 60, 60, 576];
    for (i, len) in lens.iter().enumerate() {
        let r = Record::from([
            (f::IPV4_DST, Value::Int(i as i64 % 2)),
            (f::IPV4_LEN, Value::Int(*len)),
        ]);
        counted.accept(&r).unwrap();
        summed.accept(&r).unwrap();
    }
    counted.flush(&ctx(0)).unwrap();
    summed.flush(&ctx(0)).unwrap();

    assert_eq!(seen.records()[0].int("n").unwrap(), lens.len() as i64);
    let total: i64 = summed_seen
        .records()
        .iter()
        .map(|r| r.int("bytes").unwrap())
        .sum();
    assert_eq!(total, lens.iter().sum::<i64>());
}

#[test]
fn dedup_is_idempotent() {
    let records: Vec<Record> = (0..30u8)
        .map(|i| flow(Ipv4Addr::new(10, 0, 0, i % 7), Ipv4Addr::new(10, 0, 1, i % 3), 0))
        .collect();

    let (sink, once) = MemorySink::new();
    let mut first = Distinct::new(fields([f::IPV4_SRC, f::IPV4_DST]), sink.boxed());
    for r in &records {
        first.accept(r).unwrap();
    }
    first.flush(&ctx(0)).unwrap();

    let (sink, twice) = MemorySink::new();
    let mut second = Distinct::new(fields([f::IPV4_SRC, f::IPV4_DST]), sink.boxed());
    for r in once.records().iter().chain(once.records().iter()) {
        second.accept(r).unwrap();
    }
    second.flush(&ctx(0)).unwrap();

    assert_eq!(once.records().len(), 21);
    assert_eq!(once.records(), twice.records());
}

#[test]
fn join_matches_each_pair_once_and_only_within_an_epoch() {
    let (sink, seen) = MemorySink::new();
    let (mut left, mut right) = join(f::EPOCH, host_counts("a"), host_counts("b"), sink.boxed());
    let rec = |host: i64, name: &str, eid: i64| {
        Record::from([
            ("host", Value::Int(host)),
            (name, Value::Int(host * 10)),
            (f::EPOCH, Value::Int(eid)),
        ])
    };

    left.accept(&rec(1, "a", 0)).unwrap();
    left.accept(&rec(2, "a", 0)).unwrap();
    right.accept(&rec(1, "b", 0)).unwrap();
    right.accept(&rec(1, "b", 0)).unwrap();
    right.accept(&rec(2, "b", 1)).unwrap();
    left.accept(&rec(2, "a", 1)).unwrap();

    let matched: Vec<(i64, i64)> = seen
        .records()
        .iter()
        .map(|r| (r.int("host").unwrap(), r.int(f::EPOCH).unwrap()))
        .collect();
    assert_eq!(matched, vec![(1, 0), (2, 1)]);

    // Epoch 0 is flushed once both sides have moved to epoch 1.
    assert_eq!(seen.flushes(), vec![ctx(0)]);
    assert_eq!(left.stats().matched, 2);
    assert_eq!(right.pending(), 0);
}
