//! Portsift - port scan record processing CLI
//!
//! Reads newline-delimited JSON scan records, filters them, and either
//! converts them to JSON/CSV, pretty-prints them grouped by host, greps
//! their banners, or imports the open ports into a store.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use regex::Regex;
use tracing_subscriber::EnvFilter;

use portsift_core::filter::FilterCriteria;
use portsift_core::import::{Imported, Importer};
use portsift_core::output::{convert, Format, OutputWriter};
use portsift_core::print::{print_matches, print_records, print_targets, TargetStyle};
use portsift_core::record::{Protocol, Record};
use portsift_core::store::MemoryStore;

#[derive(Parser)]
#[command(name = "portsift")]
#[command(about = "Filter, convert, and import port scan records", version)]
struct CommandLine {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert scan records to JSON or CSV
    Convert {
        /// Input file of newline-delimited JSON records, or - for stdin
        input: PathBuf,

        /// Output file, or - for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format; inferred from the output extension when omitted
        #[arg(short = 'F', long, value_enum)]
        format: Option<FormatArg>,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print scan records grouped by host and port
    Print {
        /// Input file of newline-delimited JSON records, or - for stdin
        input: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Search banner records for a regex, highlighting matches
    Grep {
        /// Regex to search application protocols and payloads for
        pattern: String,

        /// Input file of newline-delimited JSON records, or - for stdin
        input: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Import open ports from scan records into a store
    Import {
        /// Input file of newline-delimited JSON records, or - for stdin
        input: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List scan targets, one per record
    Dump {
        /// Input file of newline-delimited JSON records, or - for stdin
        input: PathBuf,

        /// Print one IP address per record
        #[arg(long, group = "style")]
        print_ips: bool,

        /// Print IP:PORT pairs (default)
        #[arg(long, group = "style")]
        print_ip_ports: bool,

        /// Print http(s) URLs for records on ports 80 and 443
        #[arg(long, group = "style")]
        print_uris: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// Record filtering flags shared by every subcommand
///
/// Flags of different kinds are ANDed together; repeating a flag ORs
/// its values. Banner-only flags restrict the stream to banner records.
#[derive(Args, Default)]
struct FilterArgs {
    /// Match records with this transport protocol
    #[arg(long, value_enum)]
    protocol: Vec<ProtocolArg>,

    /// Match records with this IP address
    #[arg(long = "ip", value_name = "IP")]
    ips: Vec<String>,

    /// Match records inside this CIDR range
    #[arg(long = "ip-range", value_name = "CIDR")]
    ip_ranges: Vec<String>,

    /// Match records with these ports (e.g. 22,80,8000-9000)
    #[arg(short = 'p', long = "ports", value_name = "LIST")]
    ports: Vec<String>,

    /// Match banner records with this application protocol
    #[arg(long = "with-app-protocol", value_name = "NAME")]
    app_protocols: Vec<String>,

    /// Match banner records whose payload contains this substring
    #[arg(long = "with-payload", value_name = "STRING")]
    payloads: Vec<String>,

    /// Match banner records whose payload matches this regex
    #[arg(long = "with-payload-regex", value_name = "REGEX")]
    payload_regexps: Vec<String>,
}

impl FilterArgs {
    fn criteria(&self) -> Result<FilterCriteria> {
        let mut builder = FilterCriteria::builder();

        for protocol in &self.protocol {
            builder = builder.protocol((*protocol).into());
        }
        for ip in &self.ips {
            builder = builder.ip(ip);
        }
        for range in &self.ip_ranges {
            builder = builder.ip_range(range);
        }
        for list in &self.ports {
            builder = builder.ports(list);
        }
        for app_protocol in &self.app_protocols {
            builder = builder.app_protocol(app_protocol);
        }
        for payload in &self.payloads {
            builder = builder.payload(payload);
        }
        for pattern in &self.payload_regexps {
            builder = builder.payload_regex(pattern);
        }

        builder.build().context("invalid filter flags")
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum ProtocolArg {
    Tcp,
    Udp,
    Icmp,
    Sctp,
    Arp,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Tcp => Protocol::Tcp,
            ProtocolArg::Udp => Protocol::Udp,
            ProtocolArg::Icmp => Protocol::Icmp,
            ProtocolArg::Sctp => Protocol::Sctp,
            ProtocolArg::Arp => Protocol::Arp,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Format::Json,
            FormatArg::Csv => Format::Csv,
        }
    }
}

fn main() -> Result<()> {
    let cli = CommandLine::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            filter,
        } => cmd_convert(&input, &output, format, &filter),
        Commands::Print { input, filter } => cmd_print(&input, &filter),
        Commands::Grep {
            pattern,
            input,
            filter,
        } => cmd_grep(&pattern, &input, &filter),
        Commands::Import { input, filter } => cmd_import(&input, &filter),
        Commands::Dump {
            input,
            print_ips,
            print_ip_ports: _,
            print_uris,
            filter,
        } => {
            let style = if print_ips {
                TargetStyle::Ips
            } else if print_uris {
                TargetStyle::Uris
            } else {
                TargetStyle::IpPorts
            };
            cmd_dump(&input, style, &filter)
        }
    }
}

fn cmd_convert(
    input: &PathBuf,
    output: &PathBuf,
    format: Option<FormatArg>,
    filter: &FilterArgs,
) -> Result<()> {
    let format = match format {
        Some(format) => format.into(),
        None if output.to_str() == Some("-") => {
            bail!("writing to stdout requires --format")
        }
        None => Format::from_path(output)
            .context("cannot infer the output format, specify --format")?,
    };

    let criteria = filter.criteria()?;
    let mut writer = open_output(output)?;

    with_records(input, |records| {
        convert(criteria.apply(records), format, &mut writer)?;
        Ok(())
    })?;
    writer.flush()?;

    Ok(())
}

fn cmd_print(input: &PathBuf, filter: &FilterArgs) -> Result<()> {
    let criteria = filter.criteria()?;

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    with_records(input, |records| {
        print_records(&mut stdout, criteria.apply(records))?;
        Ok(())
    })
}

fn cmd_grep(pattern: &str, input: &PathBuf, filter: &FilterArgs) -> Result<()> {
    let pattern = Regex::new(pattern).context("invalid search pattern")?;
    let criteria = filter.criteria()?;

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    with_records(input, |records| {
        print_matches(&mut stdout, criteria.apply(records), &pattern)?;
        Ok(())
    })
}

fn cmd_dump(input: &PathBuf, style: TargetStyle, filter: &FilterArgs) -> Result<()> {
    let criteria = filter.criteria()?;

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    with_records(input, |records| {
        print_targets(&mut stdout, criteria.apply(records), style)?;
        Ok(())
    })
}

fn cmd_import(input: &PathBuf, filter: &FilterArgs) -> Result<()> {
    let criteria = filter.criteria()?;

    let mut store = MemoryStore::new();
    let mut importer = Importer::new(&mut store);

    with_records(input, |records| {
        importer.import_with(criteria.apply(records), |entity| match entity {
            Imported::IpAddress(ip) => println!("imported address {}", ip.address),
            Imported::Port(port) => {
                println!("imported port {}/{}", port.number, port.protocol)
            }
            Imported::OpenPort(open_port) => {
                let scanned = open_port
                    .last_scanned_at
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "imported open port #{} (address #{}, port #{}, last scanned {})",
                    open_port.id, open_port.ip_address_id, open_port.port_id, scanned
                );
            }
        })?;
        Ok(())
    })?;

    println!(
        "imported {} address(es), {} port(s), {} open port(s)",
        store.ip_address_count(),
        store.port_count(),
        store.open_port_count()
    );

    Ok(())
}

/// Iterator over newline-delimited JSON records
///
/// Deserializes one line per pull and skips blank lines, so peak memory
/// does not depend on the input length. The first I/O or parse error
/// ends the iteration.
struct RecordLines<R: BufRead> {
    lines: io::Lines<R>,
    number: usize,
}

impl<R: BufRead> RecordLines<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            number: 0,
        }
    }
}

impl<R: BufRead> Iterator for RecordLines<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str(trimmed)
                    .with_context(|| format!("malformed record on line {}", self.number)),
            );
        }
    }
}

/// Open newline-delimited JSON records from a file, or stdin for `-`
fn open_records(input: &Path) -> Result<Box<dyn Iterator<Item = Result<Record>>>> {
    if input.to_str() == Some("-") {
        Ok(Box::new(RecordLines::new(io::stdin().lock())))
    } else {
        let file = File::open(input)
            .with_context(|| format!("failed to open {}", input.display()))?;
        Ok(Box::new(RecordLines::new(BufReader::new(file))))
    }
}

/// Streams the input's records into the consumer
///
/// The consumer sees a plain record iterator that pulls one line at a
/// time from the input; a read or parse error stops the stream and is
/// returned once the consumer finishes with what it was given.
fn with_records<T, F>(input: &Path, consume: F) -> Result<T>
where
    F: FnOnce(&mut dyn Iterator<Item = Record>) -> Result<T>,
{
    let mut source = open_records(input)?;
    let mut read_error = None;

    let mut records = source.by_ref().map_while(|result| match result {
        Ok(record) => Some(record),
        Err(err) => {
            read_error = Some(err);
            None
        }
    });

    let outcome = consume(&mut records);

    match read_error {
        Some(err) => Err(err),
        None => outcome,
    }
}

fn open_output(path: &PathBuf) -> Result<OutputWriter> {
    if path.to_str() == Some("-") {
        Ok(OutputWriter::stdout())
    } else {
        OutputWriter::file(path)
            .with_context(|| format!("failed to create {}", path.display()))
    }
}
