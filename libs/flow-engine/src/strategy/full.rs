use std::collections::BTreeMap;

use crate::bucket::BucketId;
use crate::error::Result;
use crate::partition::{PartitionStore, SeenSet};
use crate::record::FlowSource;
use crate::table::AggregationTable;

use super::{RunSummary, Strategy};

/// All buckets resident at once; each is written exactly once at end of input.
///
/// Memory grows with the number of distinct keys in the whole input.
pub struct FullStrategy {
    store: PartitionStore,
}

impl FullStrategy {
    pub fn new(store: PartitionStore) -> Self {
        Self { store }
    }
}

impl Strategy for FullStrategy {
    fn name(&self) -> &'static str {
        "full"
    }

    fn run(&mut self, source: &mut dyn FlowSource) -> Result<RunSummary> {
        let mut tables: BTreeMap<BucketId, AggregationTable> = BTreeMap::new();
        let mut summary = RunSummary::default();

        while let Some(record) = source.next_record()? {
            summary.records += 1;
            tables
                .entry(record.bucket().clone())
                .or_default()
                .merge(record);
        }

        // Every bucket is written once, so nothing is ever appended.
        let mut seen = SeenSet::new();
        for (bucket, table) in &tables {
            self.store.persist(bucket, table, true, &mut seen)?;
            tracing::debug!(bucket = %bucket, rows = table.len(), "bucket written");
            summary.flushes += 1;
        }
        summary.buckets = tables.len();

        Ok(summary)
    }
}
