//! Record filtering engine
//!
//! Composes a chain of predicates over a lazy record sequence. Criteria
//! are collected into an immutable [`FilterCriteria`] value before any
//! record is touched; [`FilterCriteria::apply`] then maps an iterator of
//! records to a lazily-evaluated, order-preserving subsequence.
//!
//! Criteria combine with logical AND across fields and logical OR within
//! a multi-valued field (several `ip` values, several payload patterns).
//! All syntax validation (port lists, CIDRs, regexes) happens in
//! [`FilterCriteriaBuilder::build`]; a successfully built filter never
//! fails during evaluation.
//!
//! # Example
//!
//! ```
//! use portsift_core::filter::FilterCriteria;
//! use portsift_core::record::Protocol;
//!
//! # fn example() -> portsift_core::Result<()> {
//! let criteria = FilterCriteria::builder()
//!     .protocol(Protocol::Tcp)
//!     .ports("80,443,8000-8080")
//!     .build()?;
//!
//! let records = Vec::new();
//! let filtered: Vec<_> = criteria.apply(records.into_iter()).collect();
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::ports::PortList;
use crate::record::{Protocol, Record};
use cidr::IpCidr;
use regex::Regex;
use std::collections::HashSet;
use std::net::IpAddr;
use std::str::FromStr;

/// A payload selection pattern: a literal substring or a regular
/// expression
///
/// All payload patterns of a filter are compiled into one alternation;
/// a record matches if any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadPattern {
    /// Match the payload if it contains this substring
    Literal(String),
    /// Match the payload against this regular expression
    Regex(String),
}

/// Accumulates raw filter criteria before validation
///
/// Builder methods never fail; [`FilterCriteriaBuilder::build`] performs
/// all parsing and compilation so errors surface at the configuration
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteriaBuilder {
    protocols: Vec<Protocol>,
    ips: Vec<String>,
    ip_ranges: Vec<String>,
    ports: Vec<String>,
    app_protocols: Vec<String>,
    payloads: Vec<PayloadPattern>,
}

impl FilterCriteriaBuilder {
    /// Keep records using the given transport protocol
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocols.push(protocol);
        self
    }

    /// Keep records whose address equals the given IP
    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ips.push(ip.into());
        self
    }

    /// Keep records whose address falls inside the given CIDR range
    pub fn ip_range(mut self, cidr: impl Into<String>) -> Self {
        self.ip_ranges.push(cidr.into());
        self
    }

    /// Keep records whose port is contained in the given port list
    /// (e.g. `80,443,8000-8080`)
    pub fn ports(mut self, list: impl Into<String>) -> Self {
        self.ports.push(list.into());
        self
    }

    /// Keep banner records with the given application protocol
    pub fn app_protocol(mut self, app_protocol: impl Into<String>) -> Self {
        self.app_protocols.push(app_protocol.into());
        self
    }

    /// Keep banner records whose payload contains the given substring
    pub fn payload(mut self, substring: impl Into<String>) -> Self {
        self.payloads.push(PayloadPattern::Literal(substring.into()));
        self
    }

    /// Keep banner records whose payload matches the given regex
    pub fn payload_regex(mut self, pattern: impl Into<String>) -> Self {
        self.payloads.push(PayloadPattern::Regex(pattern.into()));
        self
    }

    /// Validates and compiles the accumulated criteria
    ///
    /// # Errors
    ///
    /// Returns an error for malformed IPs, CIDRs, port lists, or payload
    /// regexes. No error can occur later during evaluation.
    pub fn build(self) -> Result<FilterCriteria> {
        let mut ips = HashSet::new();
        for ip in &self.ips {
            ips.insert(ip.parse::<IpAddr>()?);
        }

        let mut ip_ranges = Vec::new();
        for range in &self.ip_ranges {
            let cidr = IpCidr::from_str(range)
                .map_err(|_| Error::CidrParse(range.clone()))?;
            ip_ranges.push(cidr);
        }

        let mut ports = Vec::new();
        for list in &self.ports {
            ports.push(PortList::parse(list)?);
        }

        let payload_regex = if self.payloads.is_empty() {
            None
        } else {
            Some(compile_alternation(&self.payloads)?)
        };

        Ok(FilterCriteria {
            protocols: self.protocols.into_iter().collect(),
            ips,
            ip_ranges,
            ports,
            app_protocols: self.app_protocols.into_iter().collect(),
            payload_regex,
        })
    }
}

/// A validated, immutable set of record selection criteria
///
/// Construct via [`FilterCriteria::builder`]. An empty criteria set is
/// the identity filter over status records.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    protocols: HashSet<Protocol>,
    ips: HashSet<IpAddr>,
    ip_ranges: Vec<IpCidr>,
    ports: Vec<PortList>,
    app_protocols: HashSet<String>,
    payload_regex: Option<Regex>,
}

impl FilterCriteria {
    /// Returns a builder with no criteria set
    pub fn builder() -> FilterCriteriaBuilder {
        FilterCriteriaBuilder::default()
    }

    /// Returns `true` if any banner-specific criterion is active
    ///
    /// Banner-only criteria (app protocol, payload) are meaningless
    /// against status records, so their presence implicitly restricts
    /// the stream to banner records. Without them the stream is
    /// restricted to status records. This asymmetry mirrors how the
    /// criteria are used: port/protocol selection describes probe
    /// results, payload selection describes captured banners.
    pub fn restricts_to_banners(&self) -> bool {
        !self.app_protocols.is_empty() || self.payload_regex.is_some()
    }

    /// Applies the criteria to a record sequence
    ///
    /// Returns a lazy, order-preserving iterator: each downstream pull
    /// performs at most the upstream pulls needed to find the next
    /// matching record. The variant restriction is applied first; the
    /// remaining predicates are pure and commute.
    pub fn apply<'a, I>(&'a self, records: I) -> impl Iterator<Item = Record> + 'a
    where
        I: Iterator<Item = Record> + 'a,
    {
        let banners = self.restricts_to_banners();

        records
            .filter(move |record| match record {
                Record::Status(_) => !banners,
                Record::Banner(_) => banners,
            })
            .filter(move |record| self.matches_protocol(record))
            .filter(move |record| self.matches_ip(record))
            .filter(move |record| self.matches_ip_range(record))
            .filter(move |record| self.matches_port(record))
            .filter(move |record| self.matches_app_protocol(record))
            .filter(move |record| self.matches_payload(record))
    }

    fn matches_protocol(&self, record: &Record) -> bool {
        self.protocols.is_empty() || self.protocols.contains(&record.protocol())
    }

    fn matches_ip(&self, record: &Record) -> bool {
        self.ips.is_empty() || self.ips.contains(&record.ip())
    }

    fn matches_ip_range(&self, record: &Record) -> bool {
        self.ip_ranges.is_empty()
            || self
                .ip_ranges
                .iter()
                .any(|range| range.contains(&record.ip()))
    }

    fn matches_port(&self, record: &Record) -> bool {
        self.ports.is_empty()
            || self.ports.iter().any(|list| list.contains(record.port()))
    }

    fn matches_app_protocol(&self, record: &Record) -> bool {
        if self.app_protocols.is_empty() {
            return true;
        }

        match record {
            Record::Banner(banner) => self.app_protocols.contains(&banner.app_protocol),
            Record::Status(_) => false,
        }
    }

    fn matches_payload(&self, record: &Record) -> bool {
        let Some(ref regex) = self.payload_regex else {
            return true;
        };

        match record {
            Record::Banner(banner) => regex.is_match(&banner.payload),
            Record::Status(_) => false,
        }
    }
}

/// Compiles literal and regex payload patterns into one alternation
fn compile_alternation(patterns: &[PayloadPattern]) -> Result<Regex> {
    let alternation = patterns
        .iter()
        .map(|pattern| match pattern {
            PayloadPattern::Literal(literal) => regex::escape(literal),
            PayloadPattern::Regex(pattern) => format!("(?:{pattern})"),
        })
        .collect::<Vec<_>>()
        .join("|");

    Ok(Regex::new(&alternation)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BannerRecord, PortStatus, ReasonFlag, StatusRecord};
    use chrono::{TimeZone, Utc};

    fn status(ip: &str, port: u16, protocol: Protocol) -> Record {
        Record::Status(StatusRecord {
            status: PortStatus::Open,
            protocol,
            port,
            reason: vec![ReasonFlag::Syn, ReasonFlag::Ack],
            ttl: 54,
            ip: ip.parse().unwrap(),
            timestamp: Utc.timestamp_opt(1629960621, 0).unwrap(),
            mac: None,
        })
    }

    fn banner(ip: &str, port: u16, app_protocol: &str, payload: &str) -> Record {
        Record::Banner(BannerRecord {
            protocol: Protocol::Tcp,
            port,
            ip: ip.parse().unwrap(),
            timestamp: Utc.timestamp_opt(1629960621, 0).unwrap(),
            app_protocol: app_protocol.to_string(),
            payload: payload.to_string(),
        })
    }

    fn sample_records() -> Vec<Record> {
        vec![
            status("93.184.216.34", 80, Protocol::Tcp),
            status("93.184.216.34", 443, Protocol::Tcp),
            status("192.168.1.10", 53, Protocol::Udp),
            banner("93.184.216.34", 80, "http_server", "ECS (sec/974D)"),
            banner("192.168.1.10", 53, "dns", "bind 9.16.1"),
        ]
    }

    #[test]
    fn test_empty_criteria_keeps_status_records() {
        let criteria = FilterCriteria::builder().build().unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|r| matches!(r, Record::Status(_))));
    }

    #[test]
    fn test_banner_criteria_restrict_to_banners() {
        let criteria = FilterCriteria::builder()
            .app_protocol("http_server")
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 1);
        assert!(matches!(&filtered[0], Record::Banner(b) if b.app_protocol == "http_server"));
    }

    #[test]
    fn test_payload_regex_restricts_to_banners() {
        let criteria = FilterCriteria::builder()
            .payload_regex("ECS")
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 1);
        assert!(matches!(&filtered[0], Record::Banner(b) if b.payload.contains("ECS")));
    }

    #[test]
    fn test_filter_by_protocol() {
        let criteria = FilterCriteria::builder()
            .protocol(Protocol::Udp)
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].protocol(), Protocol::Udp);
    }

    #[test]
    fn test_filter_by_ip_exact() {
        let criteria = FilterCriteria::builder()
            .ip("192.168.1.10")
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].ip().to_string(), "192.168.1.10");
    }

    #[test]
    fn test_filter_by_multiple_ips_is_or() {
        let criteria = FilterCriteria::builder()
            .ip("192.168.1.10")
            .ip("93.184.216.34")
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_filter_by_ip_range() {
        let criteria = FilterCriteria::builder()
            .ip_range("192.168.0.0/16")
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].ip().to_string(), "192.168.1.10");
    }

    #[test]
    fn test_filter_by_port_list() {
        let criteria = FilterCriteria::builder()
            .ports("80,8000-8080")
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].port(), 80);
    }

    #[test]
    fn test_criteria_combine_with_and() {
        let criteria = FilterCriteria::builder()
            .protocol(Protocol::Tcp)
            .ports("443")
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].port(), 443);
    }

    #[test]
    fn test_payload_literal_is_escaped() {
        // "(sec" is not a valid regex; as a literal it must match verbatim
        let criteria = FilterCriteria::builder()
            .payload("(sec/974D)")
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_payload_patterns_combine_with_or() {
        let criteria = FilterCriteria::builder()
            .payload("bind")
            .payload_regex("^ECS")
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_order_preserved() {
        let criteria = FilterCriteria::builder()
            .protocol(Protocol::Tcp)
            .build()
            .unwrap();
        let filtered: Vec<_> = criteria.apply(sample_records().into_iter()).collect();

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].port(), 80);
        assert_eq!(filtered[1].port(), 443);
    }

    #[test]
    fn test_lazy_evaluation_is_single_pass() {
        let criteria = FilterCriteria::builder()
            .ports("443")
            .build()
            .unwrap();

        let mut pulled = 0;
        let source = sample_records().into_iter().inspect(|_| pulled += 1);
        let first = criteria.apply(source).next();

        assert!(first.is_some());
        // stops as soon as the first match is found
        assert_eq!(pulled, 2);
    }

    #[test]
    fn test_invalid_cidr_rejected_at_build() {
        let result = FilterCriteria::builder().ip_range("10.0.0.0/33").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_ip_rejected_at_build() {
        let result = FilterCriteria::builder().ip("not-an-ip").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_ports_rejected_at_build() {
        let result = FilterCriteria::builder().ports("80-").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_regex_rejected_at_build() {
        let result = FilterCriteria::builder().payload_regex("(unclosed").build();
        assert!(result.is_err());
    }
}
