use std::path::PathBuf;
use std::str::FromStr;

use crate::error::EngineError;
use crate::partition::PartitionStore;
use crate::strategy::{FullStrategy, StreamingStrategy, Strategy};

// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// Стратегия агрегации.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Every bucket in memory, one write per bucket.
    #[default]
    Full,
    /// One bucket in memory, flush on bucket change, then commit.
    Streaming,
}

/// Which partition files the commit pass rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitScope {
    /// Every `<bucket>.csv` in the output directory, including leftovers.
    #[default]
    All,
    /// Only buckets flushed during this run.
    Touched,
}

impl FromStr for Mode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Mode::Full),
            "streaming" => Ok(Mode::Streaming),
            other => Err(EngineError::Config(format!(
                "mode must be \"full\" or \"streaming\", got {other:?}"
            ))),
        }
    }
}

impl FromStr for CommitScope {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(CommitScope::All),
            "touched" => Ok(CommitScope::Touched),
            other => Err(EngineError::Config(format!(
                "commit scope must be \"all\" or \"touched\", got {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct EngineConfig {
    /// Directory holding one `<bucket>.csv` per hour. Must exist.
    pub output_dir: PathBuf,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub commit_scope: CommitScope,
}

impl EngineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            mode: Mode::default(),
            commit_scope: CommitScope::default(),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_commit_scope(mut self, scope: CommitScope) -> Self {
        self.commit_scope = scope;
        self
    }

    /// Build the strategy this config selects.
    pub fn strategy(&self) -> Box<dyn Strategy> {
        let store = PartitionStore::new(&self.output_dir);
        match self.mode {
            Mode::Full => Box::new(FullStrategy::new(store)),
            Mode::Streaming => Box::new(StreamingStrategy::new(store, self.commit_scope)),
        }
    }
}
