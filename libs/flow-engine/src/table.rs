use std::collections::HashMap;

use crate::error::Result;
use crate::record::{AggregatedRecord, AggregationKey, FlowRecord, FlowSource};

/// Counters summed per [`AggregationKey`]. No I/O.
#[derive(Debug, Clone, Default)]
pub struct AggregationTable {
    entries: HashMap<AggregationKey, AggregatedRecord>,
}

impl AggregationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the record, or add its counters to the entry already under its key.
    pub fn merge(&mut self, record: FlowRecord) {
        match self.entries.get_mut(&record.key) {
            Some(agg) => agg.add(&record),
            None => {
                self.entries.insert(record.key.clone(), record.into());
            }
        }
    }

    /// Merge everything `source` yields; returns the number of records read.
    pub fn absorb(&mut self, source: &mut (impl FlowSource + ?Sized)) -> Result<u64> {
        let mut count = 0;
        while let Some(record) = source.next_record()? {
            self.merge(record);
            count += 1;
        }
        Ok(count)
    }

    pub fn get(&self, key: &AggregationKey) -> Option<&AggregatedRecord> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &AggregatedRecord> {
        self.entries.values()
    }

    /// Entries ordered by key, so that persisted files are reproducible.
    pub fn sorted(&self) -> Vec<&AggregatedRecord> {
        let mut records: Vec<_> = self.entries.values().collect();
        records.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        records
    }
}
