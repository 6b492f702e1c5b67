use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use codec_csv::{CsvReader, CsvWriter, RowSink};

use crate::bucket::{BucketId, PARTITION_EXT};
use crate::error::{EngineError, Result};
use crate::record::{compact, CompactDecoder};
use crate::table::AggregationTable;

// ════════════════════════════════════════════════════════════════
//  SeenSet
// ════════════════════════════════════════════════════════════════

/// Buckets whose partition file was created during the current run.
///
/// A file for a bucket outside the set is a leftover from an earlier run and
/// gets truncated on first write; a bucket inside the set is appended to.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    buckets: HashSet<BucketId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, bucket: &BucketId) -> bool {
        self.buckets.contains(bucket)
    }

    /// `true` if the bucket was not there yet.
    pub fn insert(&mut self, bucket: BucketId) -> bool {
        self.buckets.insert(bucket)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BucketId> {
        self.buckets.iter()
    }
}

// ════════════════════════════════════════════════════════════════
//  PartitionStore
// ════════════════════════════════════════════════════════════════

/// How [`PartitionStore::persist`] opened the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Created or truncated, header written.
    Created,
    /// Rows appended after existing content, no header.
    Appended,
}

/// One compact CSV file per bucket: `{dir}/{YYYY-MM-DD-HH}.csv`.
#[derive(Debug, Clone)]
pub struct PartitionStore {
    dir: PathBuf,
}

impl PartitionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Путь к файлу партиции.
    pub fn path_for(&self, bucket: &BucketId) -> PathBuf {
        self.dir.join(bucket.file_name())
    }

    /// Write every entry of `table` to the bucket's file.
    ///
    /// The file is truncated and given a header when `overwrite` is set or the
    /// bucket is not in `seen`; the bucket then joins `seen`. Otherwise rows are
    /// appended.
    pub fn persist(
        &self,
        bucket: &BucketId,
        table: &AggregationTable,
        overwrite: bool,
        seen: &mut SeenSet,
    ) -> Result<PersistOutcome> {
        let path = self.path_for(bucket);

        if overwrite || !seen.contains(bucket) {
            let f = File::create(&path)
                .map_err(|e| EngineError::io(format!("create {}", path.display()), e))?;
            write_table(f, table, true).map_err(|e| e.with_context(path.display()))?;
            seen.insert(bucket.clone());
            Ok(PersistOutcome::Created)
        } else {
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| EngineError::io(format!("open {}", path.display()), e))?;
            write_table(f, table, false).map_err(|e| e.with_context(path.display()))?;
            Ok(PersistOutcome::Appended)
        }
    }

    /// Read a whole partition file back into one table.
    ///
    /// A zero-length file (interrupted create) reads as empty.
    pub fn load(&self, bucket: &BucketId) -> Result<AggregationTable> {
        let path = self.path_for(bucket);
        let f = File::open(&path)
            .map_err(|e| EngineError::io(format!("open {}", path.display()), e))?;
        let empty = f
            .metadata()
            .map_err(|e| EngineError::io(format!("stat {}", path.display()), e))?
            .len()
            == 0;

        let mut table = AggregationTable::new();
        if !empty {
            let mut decoder = CompactDecoder::new(CsvReader::new(BufReader::new(f)))
                .map_err(|e| e.with_context(path.display()))?;
            table
                .absorb(&mut decoder)
                .map_err(|e| e.with_context(path.display()))?;
        }
        Ok(table)
    }

    /// Partition files currently in the directory, ordered by bucket.
    ///
    /// Only `<bucket>.csv` names with a valid bucket id count; anything else in
    /// the directory is not ours. A missing directory has no partitions.
    pub fn partition_files(&self) -> Result<Vec<BucketId>> {
        let dir = match std::fs::read_dir(&self.dir) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EngineError::io(format!("read dir {}", self.dir.display()), e)),
        };

        let mut buckets = Vec::new();
        for entry in dir {
            let entry =
                entry.map_err(|e| EngineError::io(format!("read dir {}", self.dir.display()), e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PARTITION_EXT) {
                continue;
            }
            let Some(bucket) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(BucketId::parse)
            else {
                continue;
            };
            if !path.is_file() {
                continue;
            }
            buckets.push(bucket);
        }
        buckets.sort();
        Ok(buckets)
    }
}

fn write_table(f: File, table: &AggregationTable, header: bool) -> Result<()> {
    let mut w = CsvWriter::new(BufWriter::new(f));
    if header {
        w.write_row(&compact::HEADER)?;
    }
    for record in table.sorted() {
        record.write_compact(&mut w)?;
    }
    w.flush()?;
    Ok(())
}
