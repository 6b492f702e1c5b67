#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv: {0}")]
    Codec(#[from] codec_csv::CodecError),

    #[error("{0}")]
    Engine(#[from] flow_engine::EngineError),
}
