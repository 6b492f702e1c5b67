//! Hourly flow aggregation.
//!
//! Flow export rows are decoded into [`FlowRecord`]s, keyed by
//! `(hour bucket, destination IP, protocol)` and summed into one compact CSV
//! file per hour. Two strategies produce identical totals: [`FullStrategy`]
//! holds everything in memory, [`StreamingStrategy`] holds one bucket at a time
//! and merges its partition files in a final commit pass.

pub mod bucket;
pub mod commit;
pub mod config;
pub mod counter;
pub mod error;
pub mod partition;
pub mod record;
pub mod strategy;
pub mod table;

use codec_csv::RowSource;

pub use bucket::BucketId;
pub use config::{CommitScope, EngineConfig, Mode};
pub use error::{EngineError, ErrorKind, Result};
pub use partition::{PartitionStore, PersistOutcome, SeenSet};
pub use record::{
    AggregatedRecord, AggregationKey, CompactDecoder, FlowRecord, FlowSource, RecordDecoder,
};
pub use strategy::{BucketTracker, FullStrategy, RunSummary, StreamingStrategy, Strategy};
pub use table::AggregationTable;

/// Aggregate every row of `source` into `config.output_dir`.
///
/// Reads the header first; the first failing row aborts the run.
pub fn run<S: RowSource>(config: &EngineConfig, source: S) -> Result<RunSummary> {
    let mut decoder = RecordDecoder::new(source).map_err(|e| e.with_context("input header"))?;
    let mut strategy = config.strategy();

    tracing::info!(
        strategy = strategy.name(),
        output = %config.output_dir.display(),
        "aggregation started"
    );
    let summary = strategy.run(&mut decoder)?;
    tracing::info!(
        records = summary.records,
        buckets = summary.buckets,
        flushes = summary.flushes,
        appends = summary.appends,
        committed = summary.committed,
        "aggregation finished"
    );

    Ok(summary)
}
