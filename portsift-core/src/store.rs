//! Persisted entities and the store collaborator
//!
//! The importer writes three entity kinds through the [`ScanStore`]
//! trait: IP addresses, ports, and the open-port association between
//! them. Each entity is unique by its natural key and is created lazily
//! on first observation; the pipeline never deletes entities.
//!
//! Every `find_or_create_*` operation is atomic at the entity level:
//! a single indivisible create-if-absent-else-fetch against the store.
//! Implementations own their transaction and connection discipline;
//! the core issues calls strictly in record order and never overlaps
//! them. [`MemoryStore`] is an in-process implementation used by tests
//! and the CLI.

use crate::error::Result;
use crate::record::Protocol;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A persisted IP address, unique by `(version, address)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpAddress {
    /// Store-assigned identifier
    pub id: u64,
    /// IP version, 4 or 6
    pub version: u8,
    /// String form of the address
    pub address: String,
}

/// A persisted port, unique by `(protocol, number)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Store-assigned identifier
    pub id: u64,
    /// Transport protocol
    pub protocol: Protocol,
    /// Port number
    pub number: u16,
}

/// A persisted association between an IP address and an open port,
/// unique by the pair
///
/// `last_scanned_at` is the only field mutated after creation; it is
/// overwritten on every re-observation of the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPort {
    /// Store-assigned identifier
    pub id: u64,
    /// Identifier of the associated [`IpAddress`]
    pub ip_address_id: u64,
    /// Identifier of the associated [`Port`]
    pub port_id: u64,
    /// When the pair was last observed open
    pub last_scanned_at: Option<DateTime<Utc>>,
}

/// Store collaborator for the importer
///
/// Each method is an idempotent upsert: calling it twice with the same
/// key yields the same entity without creating a duplicate. Errors
/// propagate to the importer's caller; re-running an import after a
/// store error is safe.
pub trait ScanStore {
    /// Find or create an IP address by `(version, address)`
    fn find_or_create_ip_address(&mut self, version: u8, address: &str) -> Result<IpAddress>;

    /// Find or create a port by `(protocol, number)`
    fn find_or_create_port(&mut self, protocol: Protocol, number: u16) -> Result<Port>;

    /// Find or create the open-port association for the pair
    fn find_or_create_open_port(&mut self, ip_address: &IpAddress, port: &Port)
        -> Result<OpenPort>;

    /// Overwrite `last_scanned_at` on an open port, returning the
    /// updated entity
    fn update_last_scanned_at(
        &mut self,
        open_port: &OpenPort,
        timestamp: DateTime<Utc>,
    ) -> Result<OpenPort>;
}

/// In-memory [`ScanStore`] implementation
///
/// Backs tests and the CLI's import demonstration. Identifiers are
/// assigned sequentially across all entity kinds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: u64,
    ip_addresses: HashMap<(u8, String), IpAddress>,
    ports: HashMap<(Protocol, u16), Port>,
    open_ports: HashMap<(u64, u64), OpenPort>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored IP addresses
    pub fn ip_address_count(&self) -> usize {
        self.ip_addresses.len()
    }

    /// Returns the number of stored ports
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Returns the number of stored open-port associations
    pub fn open_port_count(&self) -> usize {
        self.open_ports.len()
    }

    /// Looks up an open port by its associated entity ids
    pub fn open_port(&self, ip_address_id: u64, port_id: u64) -> Option<&OpenPort> {
        self.open_ports.get(&(ip_address_id, port_id))
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl ScanStore for MemoryStore {
    fn find_or_create_ip_address(&mut self, version: u8, address: &str) -> Result<IpAddress> {
        let key = (version, address.to_string());

        if let Some(existing) = self.ip_addresses.get(&key) {
            return Ok(existing.clone());
        }

        let entity = IpAddress {
            id: self.next_id(),
            version,
            address: address.to_string(),
        };
        self.ip_addresses.insert(key, entity.clone());
        Ok(entity)
    }

    fn find_or_create_port(&mut self, protocol: Protocol, number: u16) -> Result<Port> {
        let key = (protocol, number);

        if let Some(existing) = self.ports.get(&key) {
            return Ok(existing.clone());
        }

        let entity = Port {
            id: self.next_id(),
            protocol,
            number,
        };
        self.ports.insert(key, entity.clone());
        Ok(entity)
    }

    fn find_or_create_open_port(
        &mut self,
        ip_address: &IpAddress,
        port: &Port,
    ) -> Result<OpenPort> {
        let key = (ip_address.id, port.id);

        if let Some(existing) = self.open_ports.get(&key) {
            return Ok(existing.clone());
        }

        let id = self.next_id();
        let entity = OpenPort {
            id,
            ip_address_id: ip_address.id,
            port_id: port.id,
            last_scanned_at: None,
        };
        self.open_ports.insert(key, entity.clone());
        Ok(entity)
    }

    fn update_last_scanned_at(
        &mut self,
        open_port: &OpenPort,
        timestamp: DateTime<Utc>,
    ) -> Result<OpenPort> {
        let key = (open_port.ip_address_id, open_port.port_id);
        let entry = self
            .open_ports
            .get_mut(&key)
            .ok_or_else(|| crate::Error::Database(format!("no such open port: {key:?}")))?;

        entry.last_scanned_at = Some(timestamp);
        Ok(entry.clone())
    }
}
