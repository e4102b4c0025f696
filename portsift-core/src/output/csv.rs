//! CSV output format
//!
//! Emits a record sequence under the unified 14-column row schema, so
//! status and banner rows are line-compatible in one table. A status
//! row populates the eight `status.*` columns; a banner row populates
//! the six `banner.*` columns; every other field is an empty string.
//! Quoting and escaping follow RFC 4180 via the `csv` crate.

use crate::error::Result;
use crate::record::{BannerRecord, Record, StatusRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;

/// The unified row schema header, emitted verbatim as the first row
pub const HEADER: [&str; 14] = [
    "type",
    "status.status",
    "status.protocol",
    "status.port",
    "status.reason",
    "status.ttl",
    "status.ip",
    "status.timestamp",
    "banner.protocol",
    "banner.port",
    "banner.ip",
    "banner.timestamp",
    "banner.app_protocol",
    "banner.payload",
];

/// Converts a record sequence to CSV, writing to the sink
///
/// The header row is always written, even for an empty sequence.
pub fn convert<I, W>(records: I, output: W) -> Result<()>
where
    I: Iterator<Item = Record>,
    W: Write,
{
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(HEADER)?;

    for record in records {
        writer.write_record(record_to_row(&record))?;
    }

    writer.flush()?;
    Ok(())
}

/// Renders one record as a 14-field row
fn record_to_row(record: &Record) -> [String; 14] {
    match record {
        Record::Status(status) => status_to_row(status),
        Record::Banner(banner) => banner_to_row(banner),
    }
}

fn status_to_row(status: &StatusRecord) -> [String; 14] {
    let reason = status
        .reason
        .iter()
        .map(|flag| flag.to_string())
        .collect::<Vec<_>>()
        .join(",");

    [
        "status".to_string(),
        status.status.to_string(),
        status.protocol.to_string(),
        status.port.to_string(),
        reason,
        status.ttl.to_string(),
        status.ip.to_string(),
        format_timestamp(status.timestamp),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
    ]
}

fn banner_to_row(banner: &BannerRecord) -> [String; 14] {
    [
        "banner".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        banner.protocol.to_string(),
        banner.port.to_string(),
        banner.ip.to_string(),
        format_timestamp(banner.timestamp),
        banner.app_protocol.clone(),
        banner.payload.clone(),
    ]
}

/// Renders a timestamp the same way the JSON converter serializes it
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
