//! Line-oriented CSV codec.
//!
//! Rows are moved as `Vec<String>` by position; column names are resolved once
//! from the header through [`ColumnMap`]. The aggregation engine only sees the
//! [`RowSource`] and [`RowSink`] traits.

mod error;
mod parser;
mod reader;
mod writer;

pub use error::CodecError;
pub use parser::{encode_field, parse_delimiter, parse_fields, ColumnMap, FieldError};
pub use reader::CsvReader;
pub use writer::CsvWriter;

/// Delimiter and quoting rules shared by reader and writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: char,
    /// Обработка двойных кавычек по RFC 4180.
    pub quoting: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quoting: true,
        }
    }
}

/// Source of rows, read one at a time.
pub trait RowSource {
    /// Next row split into fields. `Ok(None)` means the input is exhausted.
    fn read_row(&mut self) -> Result<Option<Vec<String>>, CodecError>;

    /// 1-based number of the last physical line of the last row.
    fn line(&self) -> u64;
}

/// Sink of rows.
pub trait RowSink {
    fn write_row(&mut self, fields: &[&str]) -> Result<(), CodecError>;

    /// Push buffered rows down to the underlying writer.
    fn flush(&mut self) -> Result<(), CodecError>;
}

impl<T: RowSource + ?Sized> RowSource for &mut T {
    fn read_row(&mut self) -> Result<Option<Vec<String>>, CodecError> {
        (**self).read_row()
    }

    fn line(&self) -> u64 {
        (**self).line()
    }
}
