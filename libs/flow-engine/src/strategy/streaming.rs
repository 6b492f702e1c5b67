use crate::bucket::BucketId;
use crate::commit::commit;
use crate::config::CommitScope;
use crate::error::Result;
use crate::partition::{PartitionStore, PersistOutcome, SeenSet};
use crate::record::{FlowRecord, FlowSource};
use crate::table::AggregationTable;

use super::{RunSummary, Strategy};

// ═══════════════════════════════════════════════════════════════
//  BucketTracker
// ═══════════════════════════════════════════════════════════════

/// Current bucket of the partition phase plus the run's seen-set.
///
/// Holds at most one bucket's table. Owned by one run; never shared.
#[derive(Debug, Default)]
pub struct BucketTracker {
    active: Option<(BucketId, AggregationTable)>,
    seen: SeenSet,
    flushes: u64,
    appends: u64,
}

impl BucketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_bucket(&self) -> Option<&BucketId> {
        self.active.as_ref().map(|(bucket, _)| bucket)
    }

    /// Buckets flushed so far in this run.
    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Merge a record, flushing the active bucket first if the record starts another one.
    pub fn observe(&mut self, record: FlowRecord, store: &PartitionStore) -> Result<()> {
        let same_bucket = self.active_bucket() == Some(record.bucket());
        if !same_bucket {
            self.flush(store)?;
            self.active = Some((record.bucket().clone(), AggregationTable::new()));
        }
        if let Some((_, table)) = self.active.as_mut() {
            table.merge(record);
        }
        Ok(())
    }

    /// Write out the active bucket, if any, and go back to empty.
    pub fn flush(&mut self, store: &PartitionStore) -> Result<()> {
        let Some((bucket, table)) = self.active.take() else {
            return Ok(());
        };

        let outcome = store.persist(&bucket, &table, false, &mut self.seen)?;
        self.flushes += 1;
        if outcome == PersistOutcome::Appended {
            self.appends += 1;
        }
        tracing::debug!(bucket = %bucket, rows = table.len(), ?outcome, "bucket flushed");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  StreamingStrategy
// ═══════════════════════════════════════════════════════════════

/// Bounded-memory strategy: partition phase, then commit pass.
///
/// Memory is bounded by the distinct keys of one contiguous run of a bucket in
/// the input. Interleaved input stays correct but produces more appends.
pub struct StreamingStrategy {
    store: PartitionStore,
    scope: CommitScope,
}

impl StreamingStrategy {
    pub fn new(store: PartitionStore, scope: CommitScope) -> Self {
        Self { store, scope }
    }

    /// Partition phase only. Leaves possibly duplicated rows on disk.
    pub fn partition(&self, source: &mut dyn FlowSource) -> Result<(BucketTracker, u64)> {
        let mut tracker = BucketTracker::new();
        let mut records = 0;
        while let Some(record) = source.next_record()? {
            records += 1;
            tracker.observe(record, &self.store)?;
        }
        tracker.flush(&self.store)?;
        Ok((tracker, records))
    }
}

impl Strategy for StreamingStrategy {
    fn name(&self) -> &'static str {
        "streaming"
    }

    fn run(&mut self, source: &mut dyn FlowSource) -> Result<RunSummary> {
        let (tracker, records) = self.partition(source)?;
        tracing::info!(
            records,
            buckets = tracker.seen.len(),
            flushes = tracker.flushes,
            appends = tracker.appends,
            "partition phase done"
        );

        let committed = commit(&self.store, self.scope, tracker.seen())?;

        Ok(RunSummary {
            records,
            buckets: tracker.seen.len(),
            flushes: tracker.flushes,
            appends: tracker.appends,
            committed,
        })
    }
}
