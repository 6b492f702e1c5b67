//! Commit pass of the streaming strategy.
//!
//! A bucket flushed more than once holds the same key on several rows. Each
//! partition file is read whole into one table and written back over itself,
//! leaving one row per key. Running the pass again changes nothing.

use crate::bucket::BucketId;
use crate::config::CommitScope;
use crate::error::Result;
use crate::partition::{PartitionStore, SeenSet};

/// Re-aggregate the partition files selected by `scope`; returns how many were rewritten.
///
/// `touched` is the set of buckets flushed in this run, consulted only for
/// [`CommitScope::Touched`].
pub fn commit(store: &PartitionStore, scope: CommitScope, touched: &SeenSet) -> Result<usize> {
    let buckets: Vec<BucketId> = match scope {
        CommitScope::All => store.partition_files()?,
        CommitScope::Touched => {
            let mut buckets: Vec<_> = touched.iter().cloned().collect();
            buckets.sort();
            buckets
        }
    };

    for bucket in &buckets {
        commit_partition(store, bucket)?;
    }
    Ok(buckets.len())
}

/// Re-aggregate one partition file in place.
pub fn commit_partition(store: &PartitionStore, bucket: &BucketId) -> Result<()> {
    let table = store.load(bucket)?;
    store.persist(bucket, &table, true, &mut SeenSet::new())?;
    tracing::debug!(bucket = %bucket, rows = table.len(), "partition committed");
    Ok(())
}
