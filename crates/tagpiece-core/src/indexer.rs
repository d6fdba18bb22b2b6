//! # Table Indexer
//!
//! Maps string items (labels, or whole tokens for the LSTM path) to dense
//! integer ids. Index 0 is the padding item and index 1 the unknown item.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TagpieceError};

/// Converts label (or token) sequences to integer index sequences.
pub trait TargetIndexer: Send + Sync {
    fn convert_samples_to_indexes(&self, samples: &[Vec<String>]) -> Vec<Vec<u32>>;
}

/// A vocabulary table built from samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IndexerTable", into = "IndexerTable")]
pub struct Indexer {
    vocab: Vec<String>,
    index: HashMap<String, u32>,
}

/// On-disk form: the ordered vocabulary only.
#[derive(Serialize, Deserialize)]
struct IndexerTable {
    vocab: Vec<String>,
}

impl From<IndexerTable> for Indexer {
    fn from(table: IndexerTable) -> Self {
        Self::from_vocab(table.vocab)
    }
}

impl From<Indexer> for IndexerTable {
    fn from(indexer: Indexer) -> Self {
        Self {
            vocab: indexer.vocab,
        }
    }
}

impl Indexer {
    /// Build a table from an explicit, ordered vocabulary. Later duplicates
    /// are ignored.
    pub fn from_vocab<I, S>(vocab: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut indexer = Self {
            vocab: Vec::new(),
            index: HashMap::new(),
        };
        for item in vocab {
            indexer.insert(item.into());
        }
        indexer
    }

    /// Build a table with `pad_item` at 0, `unk_item` at 1, then every
    /// distinct item of `samples` in first-seen order.
    pub fn build(samples: &[Vec<String>], pad_item: &str, unk_item: &str) -> Self {
        let mut indexer = Self::from_vocab([pad_item, unk_item]);
        for item in samples.iter().flatten() {
            if !indexer.index.contains_key(item) {
                indexer.insert(item.clone());
            }
        }
        debug!(size = indexer.len(), "built indexer vocabulary");
        indexer
    }

    fn insert(&mut self, item: String) {
        if !self.index.contains_key(&item) {
            self.index.insert(item.clone(), self.vocab.len() as u32);
            self.vocab.push(item);
        }
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    pub fn vocab(&self) -> &[String] {
        &self.vocab
    }

    /// Id of `item`, falling back to the unknown id (1).
    pub fn get_index(&self, item: &str) -> u32 {
        self.index.get(item).copied().unwrap_or(UNK_INDEX)
    }

    /// Item for `index`.
    pub fn get_item(&self, index: u32) -> Option<&str> {
        self.vocab.get(index as usize).map(String::as_str)
    }

    /// Map index sequences back to items.
    pub fn convert_indexes_to_samples(&self, indexes: &[Vec<u32>]) -> Result<Vec<Vec<String>>> {
        indexes
            .iter()
            .map(|sample| {
                sample
                    .iter()
                    .map(|&idx| {
                        self.get_item(idx)
                            .map(str::to_string)
                            .ok_or(TagpieceError::UnknownTagIndex(idx))
                    })
                    .collect()
            })
            .collect()
    }

    /// Load a table saved with [`Indexer::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::io::read_json(path)
    }

    /// Persist the table as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::io::write_json(path, self)
    }
}

const UNK_INDEX: u32 = 1;

impl TargetIndexer for Indexer {
    fn convert_samples_to_indexes(&self, samples: &[Vec<String>]) -> Vec<Vec<u32>> {
        samples
            .iter()
            .map(|sample| sample.iter().map(|item| self.get_index(item)).collect())
            .collect()
    }
}
