//! Bibliographic harvesting.
//!
//! Walks the corpus once per call and keeps the records that fall in the
//! requested year range, belong to a known venue, are not proceedings
//! front/back matter and carry both an id and a title.
//!
//! ```text
//! RawRecord ──▶ year ──▶ venue ──▶ frontmatter ──▶ normalize ──▶ id/title ──▶ CanonicalRecord
//!               filter   classify  exclusion                    gate
//! ```
//!
//! The corpus is opened lazily on the first call (or eagerly through
//! [`Harvester::preload`]) and kept for the life of the process. A failed
//! open leaves nothing cached, so the next call tries again.

pub mod corpus;
mod method;
pub mod record;
pub mod text;
pub mod venue;

pub use corpus::{Corpus, CorpusLoader, JsonlCorpus, PathLoader};
pub use method::GetPapers;
pub use record::{Author, CanonicalRecord, FieldError, RawRecord};
pub use venue::{classify, Venue};

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{Error, Result};
use record::{record_venue_ids, record_year};

/// How often harvest progress is logged, in records.
const PROGRESS_EVERY: usize = 1000;

/// Harvest pipeline with a process-wide corpus handle.
pub struct Harvester {
    loader: Arc<dyn CorpusLoader>,
    corpus: OnceCell<Arc<dyn Corpus>>,
}

impl Harvester {
    pub fn new(loader: Arc<dyn CorpusLoader>) -> Self {
        Self {
            loader,
            corpus: OnceCell::new(),
        }
    }

    /// Open the corpus now instead of on the first harvest.
    pub async fn preload(&self) -> Result<()> {
        self.corpus().await.map(|_| ())
    }

    pub fn is_loaded(&self) -> bool {
        self.corpus.initialized()
    }

    /// The cached corpus, opening it exactly once.
    async fn corpus(&self) -> Result<Arc<dyn Corpus>> {
        self.corpus
            .get_or_try_init(|| async {
                let loader = self.loader.clone();
                let corpus = tokio::task::spawn_blocking(move || loader.open()).await??;
                info!("Corpus ready ({} records)", corpus.len());
                Ok::<_, Error>(Arc::from(corpus))
            })
            .await
            .cloned()
    }

    /// Canonical records with `year_from <= year <= year_to`, in corpus
    /// order. An inverted range yields nothing.
    pub async fn harvest(&self, year_from: i64, year_to: i64) -> Result<Vec<CanonicalRecord>> {
        info!("Harvesting papers from {} to {}...", year_from, year_to);
        let corpus = self.corpus().await?;
        let papers =
            tokio::task::spawn_blocking(move || harvest_corpus(corpus.as_ref(), year_from, year_to))
                .await?;
        info!("Harvest complete: {} papers matching criteria", papers.len());
        Ok(papers)
    }
}

/// Run the pipeline over every record of `corpus`.
pub fn harvest_corpus(corpus: &dyn Corpus, year_from: i64, year_to: i64) -> Vec<CanonicalRecord> {
    let mut out = Vec::new();
    for (index, raw) in corpus.records().enumerate() {
        let processed = index + 1;
        if processed % PROGRESS_EVERY == 0 {
            debug!(
                "Processed {} records, collected {} so far",
                processed,
                out.len()
            );
        }
        if let Some(record) = canonicalize(raw, year_from, year_to) {
            out.push(record);
        }
    }
    out
}

/// Canonical form of `raw`, or `None` when the record is filtered out.
pub fn canonicalize(raw: &RawRecord, year_from: i64, year_to: i64) -> Option<CanonicalRecord> {
    let year = record_year(raw);
    if year < year_from || year > year_to {
        return None;
    }

    let venue = classify(record_venue_ids(raw))?;

    if raw.is_frontmatter() {
        return None;
    }

    let record = CanonicalRecord::from_raw(raw, year, venue);
    record.is_complete().then_some(record)
}
