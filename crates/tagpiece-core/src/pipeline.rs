//! # Preprocessing Pipeline
//!
//! Wires Parser → Aligner → Shaper for one split according to a
//! [`PipelineConfig`]. The result is cached between runs as JSON.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{Result, TagpieceError};
use crate::preprocess::{
    AlignedCorpus, ConllParser, ParsedCorpus, SequenceShaper, ShapedExample, SubwordAligner,
};
use crate::tokenizer::SubwordTokenizer;

/// One prepared split for the transformer datasets.
///
/// `sentences` and `subtoken_checks` stay at subword level without special
/// tokens (the tokenizer adds them while encoding); `labels` are already
/// wrapped, truncated and padded to `max_length` so they line up with the
/// encoded ids position by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedData {
    pub sentences: Vec<Vec<String>>,
    pub labels: Vec<Vec<String>>,
    pub subtoken_checks: Vec<Vec<String>>,
}

impl PreparedData {
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Check that the three streams hold the same number of examples.
    pub fn validate(&self) -> Result<()> {
        if self.labels.len() != self.sentences.len()
            || self.subtoken_checks.len() != self.sentences.len()
        {
            return Err(TagpieceError::Validation(format!(
                "prepared data is ragged: {} sentences, {} labels, {} boundary masks",
                self.sentences.len(),
                self.labels.len(),
                self.subtoken_checks.len()
            )));
        }
        Ok(())
    }

    /// Load a cached split.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data: Self = crate::io::read_json(path)?;
        data.validate()?;
        Ok(data)
    }

    /// Cache the split as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::io::write_json(path, self)
    }
}

/// Summary numbers for a parsed corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub sentences: usize,
    pub words: usize,
    pub max_sentence_words: usize,
    pub tag_counts: BTreeMap<String, usize>,
}

impl CorpusStats {
    pub fn from_corpus(corpus: &ParsedCorpus) -> Self {
        let mut tag_counts = BTreeMap::new();
        for tag in corpus.labels.iter().flatten() {
            *tag_counts.entry(tag.clone()).or_insert(0) += 1;
        }
        Self {
            sentences: corpus.len(),
            words: corpus.word_count(),
            max_sentence_words: corpus.sentences.iter().map(Vec::len).max().unwrap_or(0),
            tag_counts,
        }
    }
}

/// Runs the preprocessing stages with one configuration.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    parser: ConllParser,
    aligner: SubwordAligner,
    shaper: SequenceShaper,
}

impl Preprocessor {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            parser: ConllParser::new().keep_trailing_sentence(config.keep_trailing_sentence),
            aligner: SubwordAligner::new(config.label_mode)
                .with_empty_word_policy(config.empty_word_policy),
            shaper: SequenceShaper::new(config.max_length, config.special_tokens.clone()),
        })
    }

    pub fn parser(&self) -> &ConllParser {
        &self.parser
    }

    pub fn aligner(&self) -> &SubwordAligner {
        &self.aligner
    }

    /// Parse and align raw CoNLL lines.
    pub fn align_lines<I, S, T>(&self, lines: I, tokenizer: &T) -> Result<AlignedCorpus>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        T: SubwordTokenizer + ?Sized,
    {
        let corpus = self.parser.parse(lines)?;
        self.aligner.align(&corpus.sentences, &corpus.labels, tokenizer)
    }

    /// Prepare a split for the transformer datasets.
    pub fn prepare<I, S, T>(&self, lines: I, tokenizer: &T) -> Result<PreparedData>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        T: SubwordTokenizer + ?Sized,
    {
        let AlignedCorpus {
            sentences,
            labels,
            subtoken_checks,
        } = self.align_lines(lines, tokenizer)?;
        let labels = self.shaper.shape_labels(labels);
        info!(
            examples = sentences.len(),
            max_length = self.shaper.max_length(),
            "prepared split"
        );
        Ok(PreparedData {
            sentences,
            labels,
            subtoken_checks,
        })
    }

    /// Prepare fully shaped examples (tokens, labels and mask all padded).
    pub fn prepare_shaped<I, S, T>(&self, lines: I, tokenizer: &T) -> Result<Vec<ShapedExample>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        T: SubwordTokenizer + ?Sized,
    {
        let aligned = self.align_lines(lines, tokenizer)?;
        let shaped = self.shaper.shape(aligned)?;
        info!(examples = shaped.len(), "shaped split");
        Ok(shaped)
    }
}
