use std::io::BufRead;

use crate::error::CodecError;
use crate::parser::{parse_fields, FieldError};
use crate::{CsvOptions, RowSource};

/// Reads one CSV row per record. Blank lines between records are skipped.
///
/// A quoted field may span physical lines; its line breaks come back as `\n`.
pub struct CsvReader<R> {
    inner: R,
    options: CsvOptions,
    buf: String,
    record: String,
    line: u64,
}

impl<R: BufRead> CsvReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_options(inner, CsvOptions::default())
    }

    pub fn with_options(inner: R, options: CsvOptions) -> Self {
        Self {
            inner,
            options,
            buf: String::new(),
            record: String::new(),
            line: 0,
        }
    }

    /// Next physical line without its terminator, `false` at end of input.
    fn next_line(&mut self) -> Result<bool, CodecError> {
        self.buf.clear();
        if self.inner.read_line(&mut self.buf)? == 0 {
            return Ok(false);
        }
        self.line += 1;
        let len = self.buf.trim_end_matches(['\r', '\n']).len();
        self.buf.truncate(len);
        Ok(true)
    }
}

impl<R: BufRead> RowSource for CsvReader<R> {
    fn read_row(&mut self) -> Result<Option<Vec<String>>, CodecError> {
        let start = loop {
            if !self.next_line()? {
                return Ok(None);
            }
            if !self.buf.is_empty() {
                break self.line;
            }
        };
        self.record.clear();
        self.record.push_str(&self.buf);

        loop {
            match parse_fields(&self.record, self.options.delimiter, self.options.quoting) {
                Ok(fields) => return Ok(Some(fields)),
                Err(FieldError::TextAfterQuote { position }) => {
                    return Err(CodecError::TextAfterQuote {
                        line: self.line,
                        position,
                    });
                }
                Err(FieldError::Unterminated) => {
                    if !self.next_line()? {
                        return Err(CodecError::UnterminatedQuote { line: start });
                    }
                    self.record.push('\n');
                    self.record.push_str(&self.buf);
                }
            }
        }
    }

    fn line(&self) -> u64 {
        self.line
    }
}
