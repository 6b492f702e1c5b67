/// Codec error — returned by every read/write operation of this crate.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("column '{0}' is missing from the header")]
    MissingColumn(String),

    #[error("line {line}: quoted field is never closed")]
    UnterminatedQuote { line: u64 },

    #[error("line {line}: text after closing quote in field {position}")]
    TextAfterQuote { line: u64, position: usize },

    #[error("delimiter must be a single character, got {0:?}")]
    InvalidDelimiter(String),
}
