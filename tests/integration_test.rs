//! Integration test: config load, flow ingestion, detectors, file sinks.

use flowscope::{
    config::{EngineConfig, OutputConfig},
    detectors::{self, DetectorConfig, DetectorKind, Epoching},
    ingest::{drive_all, drive_flows, drive_packets, MalformedPolicy, PacketReader, WaltsReader},
    operator::Operator,
    record::fields,
    sink::{self, MemorySink, OutputFormat},
};
use std::fmt::Write as _;
use std::io::{BufReader, Cursor};
use std::path::Path;

fn flows_to(dst: &str, sources: usize, eid: i64) -> String {
    let mut out = String::new();
    for i in 0..sources {
        writeln!(out, "10.1.{}.{},{},{},80,1,60,{}", i / 250, i % 250, dst, 1000 + i, eid).unwrap();
    }
    out
}

fn stamped(kind: DetectorKind) -> DetectorConfig {
    let mut config = DetectorConfig::new(kind);
    config.epoch = Some(Epoching::Stamped);
    config
}

#[test]
fn config_load_default() {
    let c = EngineConfig::load(Path::new("nonexistent.json")).unwrap();
    assert_eq!(c.detector.kind, DetectorKind::Ddos);
    assert_eq!(c.detector.threshold(), 45);
    assert_eq!(c.output.format, OutputFormat::Dump);
}

#[test]
fn ddos_over_flow_file_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("flows.csv");
    let output = dir.path().join("alerts.csv");
    let mut text = flows_to("192.168.1.1", 50, 0);
    text.push_str(&flows_to("192.168.1.2", 10, 0));
    text.push_str(&flows_to("192.168.1.2", 47, 2));
    std::fs::write(&input, text).unwrap();

    let out_config = OutputConfig {
        format: OutputFormat::Csv,
        path: Some(output.clone()),
        ..OutputConfig::default()
    };
    let out = sink::build(&out_config, fields::EPOCH).unwrap();
    let mut pipeline = detectors::build(&stamped(DetectorKind::Ddos), out)
        .unwrap()
        .into_single();
    let reader = WaltsReader::new(BufReader::new(std::fs::File::open(&input).unwrap()), fields::EPOCH);
    let stats = drive_flows(reader, pipeline.as_mut(), MalformedPolicy::Abort).unwrap();
    drop(pipeline);

    assert_eq!(stats.rows, 107);
    assert_eq!(stats.flushes, 4);
    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        "eid,ipv4.dst,srcs,tuples\n0,192.168.1.1,50,60\n2,192.168.1.2,47,47\n"
    );
}

#[test]
fn unspecified_addresses_stay_integers() {
    let (sink, seen) = MemorySink::new();
    let mut pipeline = detectors::build(&stamped(DetectorKind::PktsPerDst), sink.boxed())
        .unwrap()
        .into_single();
    let reader = WaltsReader::new(Cursor::new(b"0,0,0,0,5,300,0\n".to_vec()), fields::EPOCH);
    drive_flows(reader, pipeline.as_mut(), MalformedPolicy::Skip).unwrap();
    let out = seen.records();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].int(fields::IPV4_DST).unwrap(), 0);
}

#[test]
fn round_robin_feeds_one_detector_per_source() {
    let (a, seen_a) = MemorySink::new();
    let (b, seen_b) = MemorySink::new();
    let mut ops = vec![
        detectors::build(&stamped(DetectorKind::DistinctSrcs), a.boxed())
            .unwrap()
            .into_single(),
        detectors::build(&stamped(DetectorKind::DistinctSrcs), b.boxed())
            .unwrap()
            .into_single(),
    ];
    let readers = vec![
        WaltsReader::new(Cursor::new(flows_to("10.9.9.9", 3, 0).into_bytes()), fields::EPOCH),
        WaltsReader::new(Cursor::new(flows_to("10.9.9.9", 5, 1).into_bytes()), fields::EPOCH),
    ];
    let stats = drive_all(readers, &mut ops, MalformedPolicy::Abort).unwrap();
    assert_eq!(stats.accepted, 8);
    assert_eq!(seen_a.records()[0].int("srcs").unwrap(), 3);
    let b_out = seen_b.records();
    assert_eq!(b_out.len(), 1);
    assert_eq!(b_out[0].int("srcs").unwrap(), 5);
    assert_eq!(b_out[0].int(fields::EPOCH).unwrap(), 1);
}

#[test]
fn packets_are_windowed_by_the_detector() {
    let mut text = String::new();
    for i in 0..6 {
        writeln!(
            text,
            r#"{{"time": {}, "ipv4.src": "10.0.0.{}", "ipv4.dst": "10.0.0.200", "l4.dport": 80}}"#,
            0.25 * f64::from(i),
            i
        )
        .unwrap();
    }
    let (sink, seen) = MemorySink::new();
    let mut pipeline = detectors::build(&DetectorConfig::new(DetectorKind::DistinctSrcs), sink.boxed())
        .unwrap()
        .into_single();
    let reader = PacketReader::new(Cursor::new(text.into_bytes()), fields::TIME);
    let stats = drive_packets(reader, pipeline.as_mut(), MalformedPolicy::Abort).unwrap();
    assert_eq!(stats.accepted, 6);

    let per_epoch: Vec<(i64, i64)> = seen
        .records()
        .iter()
        .map(|r| (r.int(fields::EPOCH).unwrap(), r.int("srcs").unwrap()))
        .collect();
    assert_eq!(per_epoch, vec![(0, 4), (1, 2)]);
}

#[test]
fn json_lines_sink_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("alerts.ndjson");
    let out_config = OutputConfig {
        format: OutputFormat::JsonLines,
        path: Some(output.clone()),
        show_reset: true,
        ..OutputConfig::default()
    };
    let mut out = sink::build(&out_config, fields::EPOCH).unwrap();
    let reader = WaltsReader::new(Cursor::new(flows_to("10.0.0.1", 1, 0).into_bytes()), fields::EPOCH);
    drive_flows(reader, &mut out, MalformedPolicy::Abort).unwrap();
    drop(out);

    let written = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<serde_json::Value> = written
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["ipv4.dst"], "10.0.0.1");
    assert_eq!(lines[1]["reset"]["eid"], 0);
    assert_eq!(lines[1]["reset"]["tuples"], 1);
    assert_eq!(lines[2]["reset"]["eid"], 1);
    assert_eq!(lines[2]["reset"]["tuples"], 0);
}

#[test]
fn csv_static_column_with_comma_stays_one_cell() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("alerts.csv");
    let out_config = OutputConfig {
        format: OutputFormat::Csv,
        path: Some(output.clone()),
        static_field: Some(("query".to_string(), "ddos,v2".to_string())),
        ..OutputConfig::default()
    };
    let mut out = sink::build(&out_config, fields::EPOCH).unwrap();
    let reader = WaltsReader::new(Cursor::new(flows_to("10.0.0.1", 2, 0).into_bytes()), fields::EPOCH);
    drive_flows(reader, &mut out, MalformedPolicy::Abort).unwrap();
    drop(out);

    let written = std::fs::read_to_string(&output).unwrap();
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(written.as_bytes());
    let rows: Vec<csv::StringRecord> = rows.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.len() == rows[0].len()));
    assert_eq!(&rows[0][0], "query");
    assert_eq!(&rows[1][0], "ddos,v2");
}
