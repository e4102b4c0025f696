//! Record import with deduplicating upserts
//!
//! Projects a record sequence onto persisted entities with
//! at-least-once idempotent creation: re-importing the same scan never
//! creates duplicate [`IpAddress`], [`Port`], or [`OpenPort`] rows.
//!
//! Per record:
//!
//! - banner records pass through unimported (a deliberate extension
//!   point, not a dropped error)
//! - status records that are not `open` are skipped; only positive
//!   evidence of an open port is persisted
//! - open ICMP statuses import the IP address alone, since ICMP has no
//!   port semantics
//! - every other open status upserts the IP address, then the port,
//!   then the open-port association, overwriting `last_scanned_at`
//!   with the record's timestamp
//!
//! The three-step sequence for one open port is not atomic as a whole;
//! a crash between steps leaves a valid partial state that a re-run
//! repairs, because each step is itself idempotent.
//!
//! # Examples
//!
//! ```
//! use portsift_core::import::Importer;
//! use portsift_core::store::MemoryStore;
//!
//! # fn example() -> portsift_core::Result<()> {
//! let mut store = MemoryStore::new();
//! let mut importer = Importer::new(&mut store);
//!
//! let records = Vec::new();
//! importer.import_with(records.into_iter(), |imported| {
//!     println!("imported {imported:?}");
//! })?;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::record::{PortStatus, Protocol, Record, StatusRecord};
use crate::store::{IpAddress, OpenPort, Port, ScanStore};
use std::net::IpAddr;
use tracing::debug;

/// An entity touched by an import, in the order it was upserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Imported {
    /// An upserted IP address
    IpAddress(IpAddress),
    /// An upserted port
    Port(Port),
    /// An upserted open-port association, with `last_scanned_at`
    /// already overwritten
    OpenPort(OpenPort),
}

/// Imports records into a [`ScanStore`]
pub struct Importer<'a, S: ScanStore> {
    store: &'a mut S,
}

impl<'a, S: ScanStore> Importer<'a, S> {
    /// Creates an importer over the given store
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Imports a record sequence, collecting every touched entity
    ///
    /// Pull-style counterpart of [`Importer::import_with`]. The full
    /// traversal happens before this returns and every touched entity
    /// is buffered, so prefer the callback form for very large scans.
    pub fn import<I>(&mut self, records: I) -> Result<Vec<Imported>>
    where
        I: Iterator<Item = Record>,
    {
        let mut imported = Vec::new();
        self.import_with(records, |entity| imported.push(entity.clone()))?;
        Ok(imported)
    }

    /// Imports a record sequence, invoking the callback with each
    /// touched entity
    ///
    /// For a protocol-bearing open status the callback sees the IP
    /// address, then the port, then the open port; for an open ICMP
    /// status it sees the IP address alone. Store errors abort the
    /// import and propagate; completed upserts stay valid and a re-run
    /// is safe.
    pub fn import_with<I, F>(&mut self, records: I, mut callback: F) -> Result<()>
    where
        I: Iterator<Item = Record>,
        F: FnMut(&Imported),
    {
        for record in records {
            match record {
                Record::Status(status) => self.import_status(&status, &mut callback)?,
                Record::Banner(_) => {
                    // TODO: persist banner payloads once the store grows
                    // a service-banner entity
                    debug!("skipping banner record (banner import not implemented)");
                }
            }
        }

        Ok(())
    }

    fn import_status<F>(&mut self, status: &StatusRecord, callback: &mut F) -> Result<()>
    where
        F: FnMut(&Imported),
    {
        // only positive evidence of an open port is persisted
        if status.status != PortStatus::Open {
            debug!(
                ip = %status.ip,
                port = status.port,
                status = %status.status,
                "skipping non-open status record"
            );
            return Ok(());
        }

        if status.protocol == Protocol::Icmp {
            // ICMP has no port semantics; import the address alone
            self.import_ip_address(status.ip, callback)?;
            return Ok(());
        }

        self.import_open_port_status(status, callback)
    }

    fn import_open_port_status<F>(
        &mut self,
        status: &StatusRecord,
        callback: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&Imported),
    {
        let ip_address = self.import_ip_address(status.ip, callback)?;

        let port = self
            .store
            .find_or_create_port(status.protocol, status.port)?;
        callback(&Imported::Port(port.clone()));

        let open_port = self.store.find_or_create_open_port(&ip_address, &port)?;
        let open_port = self
            .store
            .update_last_scanned_at(&open_port, status.timestamp)?;
        callback(&Imported::OpenPort(open_port));

        Ok(())
    }

    fn import_ip_address<F>(&mut self, ip: IpAddr, callback: &mut F) -> Result<IpAddress>
    where
        F: FnMut(&Imported),
    {
        let version = match ip {
            IpAddr::V4(_) => 4,
            IpAddr::V6(_) => 6,
        };

        let entity = self
            .store
            .find_or_create_ip_address(version, &ip.to_string())?;
        callback(&Imported::IpAddress(entity.clone()));

        Ok(entity)
    }
}
