//! Portsift Core Library
//!
//! This library is the operational core for working with masscan-style
//! port-scan output: it filters streams of scan records against
//! multi-dimensional criteria, converts them into exchange formats, and
//! imports deduplicated entities into a store.
//!
//! Raw scan-file parsing is an external collaborator; the library
//! consumes a sequence of already-typed [`record::Record`] values and
//! processes it lazily, in source order, one record at a time.
//!
//! # Modules
//!
//! - [`record`] - Scan record variants and their fields
//! - [`ports`] - Port list parsing (`80,443,8000-8080`)
//! - [`filter`] - Predicate-chaining filter engine
//! - [`output`] - JSON and CSV converters under one unified schema
//! - [`import`] - Deduplicating import onto persisted entities
//! - [`store`] - Persisted entities and the store collaborator trait
//! - [`print`] - Grouping and highlighting for print/grep tooling
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```
//! use portsift_core::filter::FilterCriteria;
//! use portsift_core::output::{convert_to_string, Format};
//! use portsift_core::record::Protocol;
//!
//! # fn example() -> portsift_core::Result<()> {
//! let criteria = FilterCriteria::builder()
//!     .protocol(Protocol::Tcp)
//!     .ports("80")
//!     .build()?;
//!
//! let records = Vec::new();
//! let csv = convert_to_string(criteria.apply(records.into_iter()), Format::Csv)?;
//! println!("{csv}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
pub mod import;
pub mod output;
pub mod ports;
pub mod print;
pub mod record;
pub mod store;

pub use error::{Error, Result};
