//! Integration tests for importing records into a store

use portsift_core::import::{Imported, Importer};
use portsift_core::record::{PortStatus, Protocol, ReasonFlag, Record, StatusRecord};
use portsift_core::store::MemoryStore;
use chrono::{DateTime, TimeZone, Utc};

fn open_status(ip: &str, port: u16, timestamp: DateTime<Utc>) -> Record {
    Record::Status(StatusRecord {
        status: PortStatus::Open,
        protocol: Protocol::Tcp,
        port,
        reason: vec![ReasonFlag::Syn, ReasonFlag::Ack],
        ttl: 54,
        ip: ip.parse().unwrap(),
        timestamp,
        mac: None,
    })
}

#[test]
fn test_import_creates_ip_port_and_open_port() {
    let mut store = MemoryStore::new();
    let mut importer = Importer::new(&mut store);

    let ts = Utc.timestamp_opt(1629960621, 0).unwrap();
    let imported = importer
        .import(vec![open_status("93.184.216.34", 80, ts)].into_iter())
        .unwrap();

    assert_eq!(imported.len(), 3);
    assert!(matches!(&imported[0], Imported::IpAddress(ip) if ip.address == "93.184.216.34"));
    assert!(matches!(&imported[1], Imported::Port(p) if p.number == 80));
    assert!(
        matches!(&imported[2], Imported::OpenPort(op) if op.last_scanned_at == Some(ts))
    );

    assert_eq!(store.ip_address_count(), 1);
    assert_eq!(store.port_count(), 1);
    assert_eq!(store.open_port_count(), 1);
}

#[test]
fn test_reimport_deduplicates_and_refreshes_last_scanned_at() {
    let mut store = MemoryStore::new();
    let mut importer = Importer::new(&mut store);

    let first = Utc.timestamp_opt(1629960621, 0).unwrap();
    let second = Utc.timestamp_opt(1629964221, 0).unwrap();

    importer
        .import(vec![open_status("93.184.216.34", 80, first)].into_iter())
        .unwrap();
    let imported = importer
        .import(vec![open_status("93.184.216.34", 80, second)].into_iter())
        .unwrap();

    // same entities are touched again, nothing new is created
    assert_eq!(imported.len(), 3);
    assert_eq!(store.ip_address_count(), 1);
    assert_eq!(store.port_count(), 1);
    assert_eq!(store.open_port_count(), 1);

    assert!(
        matches!(&imported[2], Imported::OpenPort(op) if op.last_scanned_at == Some(second))
    );
}

#[test]
fn test_import_with_callback_sees_entities_in_upsert_order() {
    let mut store = MemoryStore::new();
    let mut importer = Importer::new(&mut store);

    let ts = Utc.timestamp_opt(1629960621, 0).unwrap();
    let records = vec![
        open_status("93.184.216.34", 80, ts),
        open_status("93.184.216.34", 443, ts),
    ];

    let mut seen = Vec::new();
    importer
        .import_with(records.into_iter(), |entity| {
            seen.push(match entity {
                Imported::IpAddress(_) => "ip",
                Imported::Port(_) => "port",
                Imported::OpenPort(_) => "open_port",
            });
        })
        .unwrap();

    assert_eq!(
        seen,
        ["ip", "port", "open_port", "ip", "port", "open_port"]
    );
    // one address, two ports
    assert_eq!(store.ip_address_count(), 1);
    assert_eq!(store.port_count(), 2);
}
