//! Core record types for parsed scan output
//!
//! This module defines the two record variants a masscan-style scanner
//! produces: port-status observations ([`StatusRecord`]) and captured
//! service banners ([`BannerRecord`]). Both are immutable values keyed by
//! `(ip, port, protocol)` and are consumed as a flat, ordered sequence;
//! any grouping happens at presentation time.
//!
//! # Examples
//!
//! ```
//! use portsift_core::record::{PortStatus, Protocol, ReasonFlag, Record, StatusRecord};
//! use chrono::{TimeZone, Utc};
//!
//! let record = Record::Status(StatusRecord {
//!     status: PortStatus::Open,
//!     protocol: Protocol::Tcp,
//!     port: 80,
//!     reason: vec![ReasonFlag::Syn, ReasonFlag::Ack],
//!     ttl: 54,
//!     ip: "93.184.216.34".parse().unwrap(),
//!     timestamp: Utc.timestamp_opt(1629960621, 0).unwrap(),
//!     mac: None,
//! });
//!
//! assert_eq!(record.port(), 80);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// A single record from a parsed scan file
///
/// The two variants are structurally disjoint, so serialization is
/// untagged: a status object carries `status`/`reason`/`ttl` fields that
/// a banner object never has. Consumers branch exhaustively on the
/// variant; adding one requires updating every `match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    /// A host/port liveness probe result
    Status(StatusRecord),
    /// Captured application-layer data for an open service
    Banner(BannerRecord),
}

impl Record {
    /// Returns the record's IP address
    pub fn ip(&self) -> IpAddr {
        match self {
            Record::Status(status) => status.ip,
            Record::Banner(banner) => banner.ip,
        }
    }

    /// Returns the record's port number
    ///
    /// ICMP status records carry port 0 by convention; it is not a
    /// service port.
    pub fn port(&self) -> u16 {
        match self {
            Record::Status(status) => status.port,
            Record::Banner(banner) => banner.port,
        }
    }

    /// Returns the record's transport protocol
    pub fn protocol(&self) -> Protocol {
        match self {
            Record::Status(status) => status.protocol,
            Record::Banner(banner) => banner.protocol,
        }
    }

    /// Returns the time the record was observed
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Record::Status(status) => status.timestamp,
            Record::Banner(banner) => banner.timestamp,
        }
    }
}

/// A port-status observation
///
/// Field declaration order is the JSON key order produced by the JSON
/// converter, so it is part of the output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Observed port state
    pub status: PortStatus,

    /// Transport protocol the probe used
    pub protocol: Protocol,

    /// Probed port number (0 for ICMP)
    pub port: u16,

    /// TCP flags (or ICMP markers) explaining the status, in wire order
    pub reason: Vec<ReasonFlag>,

    /// IP time-to-live observed on the response
    pub ttl: u8,

    /// Address of the probed host
    pub ip: IpAddr,

    /// When the probe response was observed
    pub timestamp: DateTime<Utc>,

    /// Hardware address, when the scanner captured one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

/// Captured application-layer data for an open service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannerRecord {
    /// Transport protocol the banner was captured over
    pub protocol: Protocol,

    /// Service port the banner was captured from
    pub port: u16,

    /// Address of the responding host
    pub ip: IpAddr,

    /// When the banner was captured
    pub timestamp: DateTime<Utc>,

    /// Short symbolic service identifier (e.g. `http`, `html_title`)
    pub app_protocol: String,

    /// Raw captured text, possibly multi-line
    pub payload: String,
}

/// Transport protocol of a probe or banner capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP
    Tcp,
    /// UDP
    Udp,
    /// ICMP (no port semantics)
    Icmp,
    /// SCTP
    Sctp,
    /// ARP
    Arp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Sctp => "sctp",
            Protocol::Arp => "arp",
        };
        f.write_str(name)
    }
}

/// Observed state of a probed port or host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    /// The port accepted the probe
    Open,
    /// The port actively refused the probe
    Closed,
    /// The host answered an ICMP probe
    Up,
    /// The host rejected an ICMP probe
    Down,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortStatus::Open => "open",
            PortStatus::Closed => "closed",
            PortStatus::Up => "up",
            PortStatus::Down => "down",
        };
        f.write_str(name)
    }
}

/// A single flag token from a status record's `reason` list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonFlag {
    /// SYN flag was set
    Syn,
    /// ACK flag was set
    Ack,
    /// FIN flag was set
    Fin,
    /// RST flag was set
    Rst,
    /// PSH flag was set
    Psh,
    /// URG flag was set
    Urg,
}

impl fmt::Display for ReasonFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReasonFlag::Syn => "syn",
            ReasonFlag::Ack => "ack",
            ReasonFlag::Fin => "fin",
            ReasonFlag::Rst => "rst",
            ReasonFlag::Psh => "psh",
            ReasonFlag::Urg => "urg",
        };
        f.write_str(name)
    }
}
