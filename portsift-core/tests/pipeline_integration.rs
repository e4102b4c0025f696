//! Integration tests for the filter -> convert pipeline

use portsift_core::filter::FilterCriteria;
use portsift_core::output::{convert, convert_to_string, Format, OutputWriter};
use portsift_core::print::{print_targets, TargetStyle};
use portsift_core::record::{
    BannerRecord, PortStatus, Protocol, ReasonFlag, Record, StatusRecord,
};
use chrono::{TimeZone, Utc};
use std::io::Write;

/// One open TCP status plus its banner for the same (ip, port, protocol)
fn sample_scan() -> Vec<Record> {
    vec![
        Record::Status(StatusRecord {
            status: PortStatus::Open,
            protocol: Protocol::Tcp,
            port: 80,
            reason: vec![ReasonFlag::Syn, ReasonFlag::Ack],
            ttl: 54,
            ip: "93.184.216.34".parse().unwrap(),
            timestamp: Utc.timestamp_opt(1629960621, 0).unwrap(),
            mac: None,
        }),
        Record::Banner(BannerRecord {
            protocol: Protocol::Tcp,
            port: 80,
            ip: "93.184.216.34".parse().unwrap(),
            timestamp: Utc.timestamp_opt(1629960621, 0).unwrap(),
            app_protocol: "http_server".to_string(),
            payload: "ECS (sec/974D)".to_string(),
        }),
    ]
}

#[test]
fn test_filter_then_csv_convert() {
    // the status filter drops the banner; protocol and port both match
    let criteria = FilterCriteria::builder()
        .protocol(Protocol::Tcp)
        .ports("80")
        .build()
        .unwrap();

    let filtered = criteria.apply(sample_scan().into_iter());
    let csv = convert_to_string(filtered, Format::Csv).unwrap();

    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("type,status.status,"));
    assert!(lines[1].starts_with("status,open,tcp,80,"));
    assert!(lines[1].contains("93.184.216.34"));
    // no banner-only criterion was set, so no banner row appears
    assert!(!csv.contains("banner,"));
}

#[test]
fn test_unfiltered_csv_has_both_row_kinds() {
    let csv = convert_to_string(sample_scan().into_iter(), Format::Csv).unwrap();

    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("status,open,tcp,80,"));
    assert!(lines[2].starts_with("banner,,,,,,,,tcp,80,93.184.216.34,"));
    assert!(lines[2].ends_with("http_server,ECS (sec/974D)"));
}

#[test]
fn test_payload_regex_implies_banner_restriction() {
    let criteria = FilterCriteria::builder()
        .payload_regex("ECS")
        .build()
        .unwrap();

    let filtered: Vec<_> = criteria.apply(sample_scan().into_iter()).collect();

    assert_eq!(filtered.len(), 1);
    assert!(matches!(&filtered[0], Record::Banner(b) if b.payload == "ECS (sec/974D)"));
}

#[test]
fn test_filter_then_target_listing() {
    let criteria = FilterCriteria::builder().ports("80").build().unwrap();

    let mut buffer = Vec::new();
    print_targets(
        &mut buffer,
        criteria.apply(sample_scan().into_iter()),
        TargetStyle::IpPorts,
    )
    .unwrap();

    assert_eq!(String::from_utf8(buffer).unwrap(), "93.184.216.34:80\n");
}

#[test]
fn test_json_round_trip_preserves_fields() {
    let records = sample_scan();
    let json = convert_to_string(records.clone().into_iter(), Format::Json).unwrap();

    let parsed: Vec<Record> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, records);
}

#[test]
fn test_convert_to_file_via_inferred_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.csv");

    let format = Format::from_path(&path).unwrap();
    let mut writer = OutputWriter::file(&path).unwrap();
    convert(sample_scan().into_iter(), format, &mut writer).unwrap();
    writer.flush().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.starts_with("type,"));
}

#[test]
fn test_unknown_extension_fails_before_io() {
    let err = Format::from_path("scan.xml").unwrap_err();
    assert!(err.to_string().contains("scan.xml"));
}

#[test]
fn test_filtered_output_is_subsequence_in_order() {
    let mut records = sample_scan();
    records.extend(sample_scan());

    let criteria = FilterCriteria::builder().build().unwrap();
    let filtered: Vec<_> = criteria.apply(records.clone().into_iter()).collect();

    // every filtered record appears in the source, in the same relative order
    let mut source = records.iter();
    for record in &filtered {
        assert!(source.any(|candidate| candidate == record));
    }
}
