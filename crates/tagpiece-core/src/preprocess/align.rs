//! # Subword Aligner
//!
//! Re-tokenizes every word into subwords and keeps three streams in step:
//! the subwords themselves, the labels spread over them, and the boundary
//! mask ("subtoken check") flagging the first subword of each word with
//! `"1"` and continuations with `"0"`.
//!
//! ```text
//! words   : قیمت   اتریوم
//! subwords: قیمت   ات   ##ریوم
//! same    : O      I-ENT I-ENT
//! x_mode  : O      I-ENT X
//! mask    : 1      1    0
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EmptyWordPolicy, LabelMode, X_TAG};
use crate::error::{Result, TagpieceError};
use crate::tokenizer::SubwordTokenizer;

/// Boundary flag for the first subword of a word.
pub const BOUNDARY_FLAG: &str = "1";

/// Boundary flag for continuation subwords.
pub const CONTINUATION_FLAG: &str = "0";

/// Subword-level sentences, labels and boundary masks, index-parallel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedCorpus {
    pub sentences: Vec<Vec<String>>,
    pub labels: Vec<Vec<String>>,
    pub subtoken_checks: Vec<Vec<String>>,
}

impl AlignedCorpus {
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// Aligns word-level data to a tokenizer's subwords.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubwordAligner {
    mode: LabelMode,
    empty_word_policy: EmptyWordPolicy,
}

impl SubwordAligner {
    pub fn new(mode: LabelMode) -> Self {
        Self {
            mode,
            empty_word_policy: EmptyWordPolicy::default(),
        }
    }

    pub fn with_empty_word_policy(mut self, policy: EmptyWordPolicy) -> Self {
        self.empty_word_policy = policy;
        self
    }

    pub fn mode(&self) -> LabelMode {
        self.mode
    }

    /// Expand sentences and their labels to subword level.
    ///
    /// # Errors
    /// - [`TagpieceError::Validation`] if the sentence and label counts differ,
    ///   or a sentence and its labels differ in length. Checked before any
    ///   tokenization happens.
    /// - [`TagpieceError::DegenerateTokenization`] for a word with no subwords
    ///   under [`EmptyWordPolicy::Fail`].
    pub fn align<T: SubwordTokenizer + ?Sized>(
        &self,
        sentences: &[Vec<String>],
        labels: &[Vec<String>],
        tokenizer: &T,
    ) -> Result<AlignedCorpus> {
        if sentences.len() != labels.len() {
            return Err(TagpieceError::Validation(format!(
                "sentences and labels should have the same number of samples ({} vs {})",
                sentences.len(),
                labels.len()
            )));
        }
        if let Some((idx, (sentence, label))) = sentences
            .iter()
            .zip(labels)
            .enumerate()
            .find(|(_, (s, l))| s.len() != l.len())
        {
            return Err(TagpieceError::Validation(format!(
                "sentence {idx} has {} words but {} labels",
                sentence.len(),
                label.len()
            )));
        }

        let mut aligned = AlignedCorpus {
            sentences: Vec::with_capacity(sentences.len()),
            labels: Vec::with_capacity(sentences.len()),
            subtoken_checks: Vec::with_capacity(sentences.len()),
        };

        for (sentence, label) in sentences.iter().zip(labels) {
            let mut tokenized = Vec::with_capacity(sentence.len());
            let mut expanded = Vec::with_capacity(sentence.len());
            let mut checks = Vec::with_capacity(sentence.len());

            for (word, tag) in sentence.iter().zip(label) {
                let subwords = self.split_word(tokenizer, word)?;
                let n_subwords = subwords.len();

                push_checks(&mut checks, n_subwords);
                tokenized.extend(subwords);

                match self.mode {
                    LabelMode::Same => {
                        expanded.extend(std::iter::repeat_n(tag.clone(), n_subwords));
                    }
                    LabelMode::XMode => {
                        expanded.push(tag.clone());
                        expanded.extend(std::iter::repeat_n(X_TAG.to_string(), n_subwords - 1));
                    }
                }
            }

            aligned.sentences.push(tokenized);
            aligned.labels.push(expanded);
            aligned.subtoken_checks.push(checks);
        }

        debug!(
            sentences = aligned.len(),
            mode = %self.mode,
            "aligned labels to subwords"
        );
        Ok(aligned)
    }

    /// Expand unlabeled sentences for inference.
    ///
    /// Returns the subword sentences and their boundary masks.
    pub fn create_test_samples<T: SubwordTokenizer + ?Sized>(
        &self,
        data: &[Vec<String>],
        tokenizer: &T,
    ) -> Result<(Vec<Vec<String>>, Vec<Vec<String>>)> {
        let mut expanded_data = Vec::with_capacity(data.len());
        let mut subtoken_checks = Vec::with_capacity(data.len());

        for item in data {
            let mut tokenized = Vec::with_capacity(item.len());
            let mut checks = Vec::with_capacity(item.len());
            for word in item {
                let subwords = self.split_word(tokenizer, word)?;
                push_checks(&mut checks, subwords.len());
                tokenized.extend(subwords);
            }
            expanded_data.push(tokenized);
            subtoken_checks.push(checks);
        }

        Ok((expanded_data, subtoken_checks))
    }

    /// Tokenize one word, applying the empty-word policy. Never returns an
    /// empty vector.
    fn split_word<T: SubwordTokenizer + ?Sized>(
        &self,
        tokenizer: &T,
        word: &str,
    ) -> Result<Vec<String>> {
        let subwords = tokenizer.tokenize(word)?;
        if !subwords.is_empty() {
            return Ok(subwords);
        }
        match self.empty_word_policy {
            EmptyWordPolicy::Fail => Err(TagpieceError::DegenerateTokenization {
                word: word.to_string(),
            }),
            EmptyWordPolicy::Unknown => {
                warn!(word, "no subwords for word, using the unknown token");
                Ok(vec![tokenizer.unk_token().to_string()])
            }
        }
    }
}

fn push_checks(checks: &mut Vec<String>, n_subwords: usize) {
    checks.push(BOUNDARY_FLAG.to_string());
    checks.extend(std::iter::repeat_n(
        CONTINUATION_FLAG.to_string(),
        n_subwords.saturating_sub(1),
    ));
}

/// Align with the default empty-word policy.
pub fn tokenize_and_keep_labels<T: SubwordTokenizer + ?Sized>(
    sentences: &[Vec<String>],
    labels: &[Vec<String>],
    tokenizer: &T,
    mode: LabelMode,
) -> Result<AlignedCorpus> {
    SubwordAligner::new(mode).align(sentences, labels, tokenizer)
}

/// Expand unlabeled sentences with the default empty-word policy.
pub fn create_test_samples<T: SubwordTokenizer + ?Sized>(
    data: &[Vec<String>],
    tokenizer: &T,
) -> Result<(Vec<Vec<String>>, Vec<Vec<String>>)> {
    SubwordAligner::default().create_test_samples(data, tokenizer)
}
