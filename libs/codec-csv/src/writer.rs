use std::io::Write;

use crate::error::CodecError;
use crate::parser::encode_field;
use crate::{CsvOptions, RowSink};

/// Writes one row per line, `\n` terminated.
pub struct CsvWriter<W: Write> {
    inner: W,
    options: CsvOptions,
    line: String,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, CsvOptions::default())
    }

    pub fn with_options(inner: W, options: CsvOptions) -> Self {
        Self {
            inner,
            options,
            line: String::new(),
        }
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(mut self) -> Result<W, CodecError> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> RowSink for CsvWriter<W> {
    fn write_row(&mut self, fields: &[&str]) -> Result<(), CodecError> {
        self.line.clear();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.line.push(self.options.delimiter);
            }
            self.line
                .push_str(&encode_field(field, self.options.delimiter, self.options.quoting));
        }
        self.line.push('\n');
        self.inner.write_all(self.line.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }
}
