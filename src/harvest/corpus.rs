//! Corpus access.
//!
//! The harvester only needs to open a corpus once and walk its records in
//! native order. [`JsonlCorpus`] is the bundled source: a dump of raw
//! records as JSON lines or a JSON array, in one file or a directory.

use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::record::RawRecord;
use crate::error::{Error, Result};

/// An opened corpus.
pub trait Corpus: Send + Sync {
    /// All records, in the corpus's native order.
    fn records(&self) -> Box<dyn Iterator<Item = &RawRecord> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Opens a corpus. Called at most once per successful initialization.
pub trait CorpusLoader: Send + Sync {
    fn open(&self) -> Result<Box<dyn Corpus>>;
}

/// In-memory corpus of raw records.
#[derive(Debug, Default)]
pub struct JsonlCorpus {
    records: Vec<RawRecord>,
}

impl JsonlCorpus {
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// Load a file, or every `.json`/`.jsonl` file of a directory in name
    /// order.
    pub fn load(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|e| {
            Error::Corpus(format!("cannot open corpus at {}: {}", path.display(), e))
        })?;

        let files = if meta.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|e| Error::Corpus(format!("cannot list {}: {}", path.display(), e)))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_corpus_file(p))
                .collect();
            files.sort();
            files
        } else {
            vec![path.to_path_buf()]
        };

        let mut records = Vec::new();
        for file in &files {
            let before = records.len();
            read_file(file, &mut records)?;
            debug!("Read {} records from {}", records.len() - before, file.display());
        }
        info!(
            "Corpus loaded: {} records from {} file(s)",
            records.len(),
            files.len()
        );
        Ok(Self { records })
    }
}

impl Corpus for JsonlCorpus {
    fn records(&self) -> Box<dyn Iterator<Item = &RawRecord> + '_> {
        Box::new(self.records.iter())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

fn is_corpus_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("jsonl")
    )
}

fn read_file(path: &Path, out: &mut Vec<RawRecord>) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Corpus(format!("cannot read {}: {}", path.display(), e)))?;

    // A `.json` file holding one array is a whole corpus; anything else is
    // read line by line.
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        if let Ok(JsonValue::Array(items)) = serde_json::from_str::<JsonValue>(&content) {
            out.extend(items.into_iter().map(RawRecord::from));
            return Ok(());
        }
    }

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonValue>(line) {
            Ok(value) => out.push(RawRecord::from(value)),
            Err(e) => warn!(
                "Skipping unparsable record at {}:{}: {}",
                path.display(),
                lineno + 1,
                e
            ),
        }
    }
    Ok(())
}

/// Loads a [`JsonlCorpus`] from a configured path.
#[derive(Debug, Clone)]
pub struct PathLoader {
    path: PathBuf,
}

impl PathLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusLoader for PathLoader {
    fn open(&self) -> Result<Box<dyn Corpus>> {
        info!(
            "Loading corpus from {} (this may take a while)...",
            self.path.display()
        );
        Ok(Box::new(JsonlCorpus::load(&self.path)?))
    }
}
