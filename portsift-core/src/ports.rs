//! Port list parsing and membership tests
//!
//! A port list mixes single ports and inclusive ranges, written the way
//! scanners accept them on the command line: `80,443,8000-8080`.
//! Parsing validates every token up front so a malformed list is rejected
//! before any record is processed.
//!
//! # Example
//!
//! ```
//! use portsift_core::ports::PortList;
//!
//! let list: PortList = "22,80,8000-8080".parse().unwrap();
//! assert!(list.contains(22));
//! assert!(list.contains(8080));
//! assert!(!list.contains(443));
//! ```

use crate::error::{Error, Result};
use std::str::FromStr;

/// A parsed list of single ports and inclusive port ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortList {
    entries: Vec<PortEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortEntry {
    Single(u16),
    Range(u16, u16),
}

impl PortList {
    /// Parses a port list such as `80,443,8000-8080`
    ///
    /// # Errors
    ///
    /// Returns an error for empty lists, non-numeric tokens, ports
    /// outside 0-65535, or reversed ranges.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.is_empty() {
            return Err(Error::PortList("empty port list".to_string()));
        }

        let mut entries = Vec::new();

        for token in input.split(',') {
            let token = token.trim();

            if let Some((start_str, end_str)) = token.split_once('-') {
                let start = parse_port(start_str)?;
                let end = parse_port(end_str)?;

                if end < start {
                    return Err(Error::PortList(format!(
                        "reversed range: {token}"
                    )));
                }

                entries.push(PortEntry::Range(start, end));
            } else {
                entries.push(PortEntry::Single(parse_port(token)?));
            }
        }

        Ok(Self { entries })
    }

    /// Returns `true` if the port is a member of the list
    pub fn contains(&self, port: u16) -> bool {
        self.entries.iter().any(|entry| match *entry {
            PortEntry::Single(number) => number == port,
            PortEntry::Range(start, end) => (start..=end).contains(&port),
        })
    }
}

impl FromStr for PortList {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_port(token: &str) -> Result<u16> {
    token
        .trim()
        .parse::<u16>()
        .map_err(|_| Error::PortList(format!("invalid port: {token}")))
}
