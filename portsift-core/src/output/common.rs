//! Common utilities for output writing

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Output writer that targets stdout or a file
///
/// Used by callers that select their destination at runtime (`-` for
/// stdout, otherwise a path). Implements [`io::Write`] so it can serve
/// as a converter sink directly.
pub struct OutputWriter {
    file: Option<File>,
    destination: String,
}

impl OutputWriter {
    /// Create a new OutputWriter for stdout
    pub fn stdout() -> Self {
        Self {
            file: None,
            destination: "-".to_string(),
        }
    }

    /// Create a new OutputWriter for a file, truncating any existing one
    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let file = File::create(&path)?;

        Ok(Self {
            file: Some(file),
            destination: path_str,
        })
    }

    /// Get the destination (file path or "-" for stdout)
    pub fn destination(&self) -> &str {
        &self.destination
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file {
            Some(ref mut file) => file.write(buf),
            None => io::stdout().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file {
            Some(ref mut file) => file.flush(),
            None => io::stdout().flush(),
        }
    }
}
