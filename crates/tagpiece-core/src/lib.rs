//! # Tagpiece Core
//!
//! Prepares token-classification (NER) data for subword models: parses
//! CoNLL corpora, aligns word-level labels to subword tokens, shapes
//! sequences to a fixed length, batches them as candle tensors and projects
//! model predictions back to word-level tags.
//!
//! ## Quick Start
//!
//! ```rust
//! use tagpiece_core::preprocess::{add_special_tokens, pad_sequence, parse_conll};
//!
//! let corpus = parse_conll("EU _ _ B-ORG\nrejects _ _ O\n\n".lines()).unwrap();
//! assert_eq!(corpus.sentences, vec![vec!["EU", "rejects"]]);
//!
//! let (tokens, labels) =
//!     add_special_tokens(corpus.sentences, corpus.labels, "[CLS]", "[SEP]").unwrap();
//! assert_eq!(labels[0], vec!["[CLS]", "B-ORG", "O", "[SEP]"]);
//!
//! let padded = pad_sequence(tokens, 6, "[PAD]");
//! assert_eq!(padded[0].len(), 6);
//! ```
pub mod config;
pub mod dataset;
pub mod error;
pub mod indexer;
pub mod inference;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod tokenizer;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary API
pub use config::{EmptyWordPolicy, LabelMode, PipelineConfig, SpecialTokens, X_TAG};
pub use dataset::{
    Batch, DataLoader, DataModule, Dataset, EncodedExample, InferenceDataset, LstmDataset,
    NerDataset,
};
pub use error::{Result, TagpieceError};
pub use indexer::{Indexer, TargetIndexer};
pub use inference::{extract_entities, project_to_words, Entity, Inference, WordPrediction};
pub use model::{SequenceModel, TokenClassifier};
pub use pipeline::{CorpusStats, PreparedData, Preprocessor};
pub use preprocess::{
    AlignedCorpus, ConllParser, ParsedCorpus, SequenceShaper, ShapedExample, SubwordAligner,
};
pub use tokenizer::{EncodeOptions, EncodedInput, HfTokenizer, SpecialIds, SubwordTokenizer};
