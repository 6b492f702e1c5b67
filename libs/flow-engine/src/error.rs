use codec_csv::CodecError;

/// Coarse classification of an [`EngineError`], stable across context wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedTimestamp,
    MalformedCounter,
    Io,
    Format,
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("malformed timestamp {text:?}")]
    MalformedTimestamp { text: String },

    #[error("malformed counter {column}={text:?}")]
    MalformedCounter { column: &'static str, text: String },

    #[error("io ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv: {0}")]
    Codec(#[from] CodecError),

    #[error("no header row")]
    MissingHeader,

    #[error("column '{column}' expected at position {position}, row has {found} fields")]
    MalformedRow {
        column: &'static str,
        position: usize,
        found: usize,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        EngineError::Io {
            context: context.into(),
            source,
        }
    }

    /// Add context to the error, preserving its [`ErrorKind`].
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        EngineError::Context {
            context: ctx.to_string(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::MalformedTimestamp { .. } => ErrorKind::MalformedTimestamp,
            EngineError::MalformedCounter { .. } => ErrorKind::MalformedCounter,
            EngineError::Io { .. } | EngineError::Codec(CodecError::Io(_)) => ErrorKind::Io,
            EngineError::Codec(CodecError::InvalidDelimiter(_)) | EngineError::Config(_) => {
                ErrorKind::Config
            }
            EngineError::Codec(
                CodecError::MissingColumn(_)
                | CodecError::UnterminatedQuote { .. }
                | CodecError::TextAfterQuote { .. },
            )
            | EngineError::MissingHeader
            | EngineError::MalformedRow { .. } => ErrorKind::Format,
            EngineError::Context { source, .. } => source.kind(),
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
