//! JSON output format
//!
//! Emits a record sequence as a JSON array of objects. Each object
//! contains only the fields relevant to its variant: status objects
//! carry `status`/`protocol`/`port`/`reason`/`ttl`/`ip`/`timestamp`
//! (plus `mac` when present), banner objects carry
//! `protocol`/`port`/`ip`/`timestamp`/`app_protocol`/`payload`. Key
//! order follows the record field declaration order, so the output is
//! reproducible byte-for-byte.

use crate::error::Result;
use crate::record::Record;
use std::io::Write;

/// Streaming JSON array writer
///
/// Writes one record at a time between an opening and closing bracket,
/// so the full sequence is never materialized.
///
/// # Examples
///
/// ```
/// use portsift_core::output::json::JsonWriter;
///
/// # fn example() -> portsift_core::Result<()> {
/// let mut buffer = Vec::new();
/// let mut writer = JsonWriter::new(&mut buffer);
/// writer.start()?;
/// // writer.write_record(&record)? for each record...
/// writer.end()?;
/// # Ok(())
/// # }
/// ```
pub struct JsonWriter<W: Write> {
    output: W,
    first_done: bool,
}

impl<W: Write> JsonWriter<W> {
    /// Create a new JsonWriter over the given sink
    pub fn new(output: W) -> Self {
        Self {
            output,
            first_done: false,
        }
    }

    /// Write the opening bracket
    pub fn start(&mut self) -> Result<()> {
        self.output.write_all(b"[")?;
        Ok(())
    }

    /// Write one record
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.first_done {
            self.output.write_all(b",")?;
        }
        self.first_done = true;

        let json = serde_json::to_string(record)?;
        self.output.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Write the closing bracket and flush
    pub fn end(&mut self) -> Result<()> {
        self.output.write_all(b"]")?;
        self.output.flush()?;
        Ok(())
    }
}

/// Converts a record sequence to JSON, writing to the sink
pub fn convert<I, W>(records: I, output: W) -> Result<()>
where
    I: Iterator<Item = Record>,
    W: Write,
{
    let mut writer = JsonWriter::new(output);

    writer.start()?;
    for record in records {
        writer.write_record(&record)?;
    }
    writer.end()
}
