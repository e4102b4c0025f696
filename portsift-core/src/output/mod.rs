//! Output conversion for scan records
//!
//! This module converts a record sequence into exchange formats under
//! one unified schema, streaming a single record at a time.
//!
//! # Formats
//!
//! - **JSON** - an array of variant-shaped objects
//! - **CSV** - rows under the fixed 14-column unified schema
//!
//! # Examples
//!
//! ```
//! use portsift_core::output::{convert_to_string, Format};
//!
//! # fn example() -> portsift_core::Result<()> {
//! let records = Vec::new();
//! let json = convert_to_string(records.into_iter(), Format::Json)?;
//! assert_eq!(json, "[]");
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod csv;
pub mod json;

pub use common::OutputWriter;

use crate::error::{Error, Result};
use crate::record::Record;
use std::io::Write;
use std::path::Path;

/// A supported output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON array output
    Json,
    /// CSV output under the unified row schema
    Csv,
}

impl Format {
    /// Infers the output format from a file path's extension
    ///
    /// `.json` maps to [`Format::Json`] and `.csv` to [`Format::Csv`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFormat`] for any other extension. This is
    /// a configuration error, surfaced before any I/O begins.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("csv") => Ok(Format::Csv),
            _ => Err(Error::UnknownFormat(path.to_path_buf())),
        }
    }
}

/// Converts a record sequence into the given format, writing to a sink
///
/// Single forward pass: one record is serialized and written at a time,
/// so peak memory does not depend on the sequence length.
pub fn convert<I, W>(records: I, format: Format, output: W) -> Result<()>
where
    I: Iterator<Item = Record>,
    W: Write,
{
    match format {
        Format::Json => json::convert(records, output),
        Format::Csv => csv::convert(records, output),
    }
}

/// Converts a record sequence and returns the fully rendered text
pub fn convert_to_string<I>(records: I, format: Format) -> Result<String>
where
    I: Iterator<Item = Record>,
{
    let mut buffer = Vec::new();
    convert(records, format, &mut buffer)?;

    // both converters only ever emit valid UTF-8
    Ok(String::from_utf8(buffer).expect("converter emitted invalid UTF-8"))
}
