//! Aggregation strategies.
//!
//! Both produce the same per-bucket totals:
//! - [`FullStrategy`] keeps one table per bucket in memory for the whole input.
//! - [`StreamingStrategy`] keeps only the current bucket, flushes on every
//!   bucket change and merges the partition files afterwards.

mod full;
mod streaming;

pub use full::FullStrategy;
pub use streaming::{BucketTracker, StreamingStrategy};

use crate::error::Result;
use crate::record::FlowSource;

/// What a run did, for the driver's final log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Flow records read from the input.
    pub records: u64,
    /// Distinct buckets written during the run.
    pub buckets: usize,
    /// Partition writes, creates and appends together.
    pub flushes: u64,
    /// Partition writes that appended to a file created earlier in the run.
    pub appends: u64,
    /// Partition files rewritten by the commit pass.
    pub committed: usize,
}

/// An aggregation strategy. Consumes the whole source, persists every bucket.
pub trait Strategy {
    fn name(&self) -> &'static str;

    fn run(&mut self, source: &mut dyn FlowSource) -> Result<RunSummary>;
}
