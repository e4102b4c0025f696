//! Presentation helpers for print and grep tooling
//!
//! Groups records for human-readable rendering and highlights pattern
//! matches in banner text. Grouping is stable: IPs appear in first-seen
//! order, and so do the `(port, protocol)` pairs within each IP.
//!
//! Highlighting wraps every match in red without altering the
//! surrounding text; multi-line payloads are rendered one indented line
//! at a time with the marker applied per line.
//!
//! Records can also be listed as plain scan targets, one line per
//! record: bare IPs, `IP:PORT` pairs, or `http(s)` URLs.

use crate::record::{Protocol, Record};
use colored::Colorize;
use regex::Regex;
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::IpAddr;

/// Groups records by IP address in stable first-seen order
pub fn group_by_ip<I>(records: I) -> Vec<(IpAddr, Vec<Record>)>
where
    I: Iterator<Item = Record>,
{
    let mut groups: Vec<(IpAddr, Vec<Record>)> = Vec::new();
    let mut index: HashMap<IpAddr, usize> = HashMap::new();

    for record in records {
        let ip = record.ip();
        match index.get(&ip) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(ip, groups.len());
                groups.push((ip, vec![record]));
            }
        }
    }

    groups
}

/// Groups records by `(port, protocol)` in stable first-seen order
pub fn group_by_port(records: Vec<Record>) -> Vec<((u16, Protocol), Vec<Record>)> {
    let mut groups: Vec<((u16, Protocol), Vec<Record>)> = Vec::new();
    let mut index: HashMap<(u16, Protocol), usize> = HashMap::new();

    for record in records {
        let key = (record.port(), record.protocol());
        match index.get(&key) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(key, groups.len());
                groups.push((key, vec![record]));
            }
        }
    }

    groups
}

/// Prints records grouped by IP
///
/// Emits a `[ ip ]` header per host, one `port/protocol  status` line
/// per status record, and an indented `app_protocol  payload` line per
/// banner record, interleaved in record order. A blank line closes
/// each host group.
pub fn print_records<W, I>(output: &mut W, records: I) -> io::Result<()>
where
    W: Write,
    I: Iterator<Item = Record>,
{
    for (ip, group) in group_by_ip(records) {
        writeln!(output, "[ {ip} ]")?;
        writeln!(output)?;

        for record in group {
            match record {
                Record::Status(status) => {
                    writeln!(
                        output,
                        "  {}/{}\t{}",
                        status.port, status.protocol, status.status
                    )?;
                }
                Record::Banner(banner) => {
                    writeln!(output, "    {}\t{}", banner.app_protocol, banner.payload)?;
                }
            }
        }

        writeln!(output)?;
    }

    Ok(())
}

/// Returns `true` if the pattern matches the record's banner text
///
/// Only banner records can match: the pattern is tested against the
/// application protocol and the payload. Status records never match.
pub fn record_matches(record: &Record, pattern: &Regex) -> bool {
    match record {
        Record::Banner(banner) => {
            pattern.is_match(&banner.app_protocol) || pattern.is_match(&banner.payload)
        }
        Record::Status(_) => false,
    }
}

/// Wraps every pattern match in the text in a red marker
pub fn highlight(text: &str, pattern: &Regex) -> String {
    pattern
        .replace_all(text, |captures: &regex::Captures<'_>| {
            captures[0].red().to_string()
        })
        .into_owned()
}

/// Prints matching records grouped by IP and `(port, protocol)` with
/// every pattern match highlighted
pub fn print_matches<W, I>(output: &mut W, records: I, pattern: &Regex) -> io::Result<()>
where
    W: Write,
    I: Iterator<Item = Record>,
{
    let matching = records.filter(|record| record_matches(record, pattern));

    for (ip, group) in group_by_ip(matching) {
        writeln!(output, "[ {ip} ]")?;
        writeln!(output)?;

        for ((port, protocol), port_group) in group_by_port(group) {
            writeln!(output, "  {port}/{protocol}")?;

            for record in port_group {
                if let Record::Banner(banner) = record {
                    let app_protocol = highlight(&banner.app_protocol, pattern);
                    let payload = highlight(&banner.payload, pattern);

                    if payload.contains('\n') {
                        writeln!(output, "    {app_protocol}")?;
                        for line in payload.trim_end_matches('\n').lines() {
                            writeln!(output, "      {line}")?;
                        }
                    } else {
                        writeln!(output, "    {app_protocol}\t{payload}")?;
                    }
                }
            }
        }

        writeln!(output)?;
    }

    Ok(())
}

/// Notation for listing records as scan targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStyle {
    /// One IP address per record
    Ips,
    /// One `IP:PORT` pair per record
    IpPorts,
    /// `http://`/`https://` URLs for records on ports 80 and 443
    Uris,
}

/// Renders one record in the given target notation
///
/// Returns `None` when the style has no rendering for the record
/// (URLs only exist for ports 80 and 443). IPv6 addresses in URLs are
/// bracketed.
pub fn format_target(record: &Record, style: TargetStyle) -> Option<String> {
    match style {
        TargetStyle::Ips => Some(record.ip().to_string()),
        TargetStyle::IpPorts => Some(format!("{}:{}", record.ip(), record.port())),
        TargetStyle::Uris => {
            let scheme = match record.port() {
                80 => "http",
                443 => "https",
                _ => return None,
            };

            let host = match record.ip() {
                IpAddr::V6(v6) => format!("[{v6}]"),
                v4 => v4.to_string(),
            };

            Some(format!("{scheme}://{host}"))
        }
    }
}

/// Prints one target line per record, in record order
pub fn print_targets<W, I>(output: &mut W, records: I, style: TargetStyle) -> io::Result<()>
where
    W: Write,
    I: Iterator<Item = Record>,
{
    for record in records {
        if let Some(target) = format_target(&record, style) {
            writeln!(output, "{target}")?;
        }
    }

    Ok(())
}
