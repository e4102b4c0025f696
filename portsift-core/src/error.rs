//! Error types for portsift-core
//!
//! Provides a unified error type for all operations in the library.
//! Configuration problems (bad port lists, CIDRs, patterns, output
//! formats) are surfaced when a pipeline is constructed, never while a
//! record stream is being consumed.

use std::net::AddrParseError;
use std::path::PathBuf;

/// Result type alias for portsift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for portsift operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// JSON serialization/deserialization error
    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error
    #[error("CSV conversion failed: {0}")]
    Csv(#[from] csv::Error),

    /// IP address parsing error
    #[error("Invalid IP address: {0}")]
    IpParse(#[from] AddrParseError),

    /// CIDR parsing error
    #[error("Invalid CIDR notation: {0}")]
    CidrParse(String),

    /// Port list parsing error
    #[error("Invalid port list: {0}")]
    PortList(String),

    /// Payload pattern compilation error
    #[error("Invalid payload pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Output format could not be inferred from a file path
    #[error("cannot infer output format from path: {0:?}")]
    UnknownFormat(PathBuf),

    /// Store error during an import
    #[error("Database error: {0}")]
    Database(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
