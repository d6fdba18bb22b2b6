//! # Sequence Shaper
//!
//! Boundary tokens, padding and truncation for parallel string streams.
//!
//! Ordering contract: add special tokens, then truncate (so the tail can be
//! replaced by `[SEP]` without losing `[CLS]`), then pad.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SpecialTokens;
use crate::error::{Result, TagpieceError};
use crate::preprocess::align::AlignedCorpus;

/// Default padding item.
pub const PAD_ITEM: &str = "[PAD]";

/// Terminator written over the tail of truncated sequences.
pub const SEP_ITEM: &str = "[SEP]";

/// Tokens, labels and boundary mask at a fixed length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapedExample {
    pub tokens: Vec<String>,
    pub labels: Vec<String>,
    pub subtoken_check: Vec<String>,
}

impl ShapedExample {
    /// Common length of the three streams.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Prepend `cls_token` and append `sep_token` to every sentence and label
/// sequence. The special token itself is used as the label.
pub fn add_special_tokens(
    sentences: Vec<Vec<String>>,
    labels: Vec<Vec<String>>,
    cls_token: &str,
    sep_token: &str,
) -> Result<(Vec<Vec<String>>, Vec<Vec<String>>)> {
    if sentences.len() != labels.len() {
        return Err(TagpieceError::Validation(format!(
            "cannot add special tokens to {} sentences with {} label sequences",
            sentences.len(),
            labels.len()
        )));
    }
    let sentences = sentences
        .into_iter()
        .map(|s| wrap(s, cls_token, sep_token))
        .collect();
    let labels = labels
        .into_iter()
        .map(|l| wrap(l, cls_token, sep_token))
        .collect();
    Ok((sentences, labels))
}

fn wrap(sequence: Vec<String>, cls_token: &str, sep_token: &str) -> Vec<String> {
    let mut wrapped = Vec::with_capacity(sequence.len() + 2);
    wrapped.push(cls_token.to_string());
    wrapped.extend(sequence);
    wrapped.push(sep_token.to_string());
    wrapped
}

/// Right-pad every sequence shorter than `max_length` with `pad_item`.
/// Longer sequences are left as they are.
pub fn pad_sequence(
    texts: Vec<Vec<String>>,
    max_length: usize,
    pad_item: &str,
) -> Vec<Vec<String>> {
    texts
        .into_iter()
        .map(|mut text| {
            if text.len() < max_length {
                text.resize(max_length, pad_item.to_string());
            }
            text
        })
        .collect()
}

/// Cut sequences longer than `max_length` to `max_length - 1` items plus a
/// trailing `[SEP]`. Shorter sequences are left as they are.
pub fn truncate_sequence(texts: Vec<Vec<String>>, max_length: usize) -> Vec<Vec<String>> {
    truncate_with_tail(texts, max_length, SEP_ITEM)
}

fn truncate_with_tail(texts: Vec<Vec<String>>, max_length: usize, tail: &str) -> Vec<Vec<String>> {
    texts
        .into_iter()
        .map(|mut text| {
            if text.len() > max_length {
                text.truncate(max_length.saturating_sub(1));
                if max_length > 0 {
                    text.push(tail.to_string());
                }
            }
            text
        })
        .collect()
}

/// Attention masks for padded sequences: 1 for real items, 0 for `pad_item`.
pub fn create_attention_masks(data: &[Vec<String>], pad_item: &str) -> Vec<Vec<u32>> {
    data.iter()
        .map(|sequence| {
            sequence
                .iter()
                .map(|item| u32::from(item != pad_item))
                .collect()
        })
        .collect()
}

/// Applies the shaping steps in contract order at a fixed length.
#[derive(Debug, Clone)]
pub struct SequenceShaper {
    max_length: usize,
    special_tokens: SpecialTokens,
}

impl SequenceShaper {
    pub fn new(max_length: usize, special_tokens: SpecialTokens) -> Self {
        Self {
            max_length,
            special_tokens,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Label sequences ready for a target indexer: CLS/SEP added, truncated,
    /// padded to `max_length`.
    pub fn shape_labels(&self, labels: Vec<Vec<String>>) -> Vec<Vec<String>> {
        let SpecialTokens { cls, sep, pad, .. } = &self.special_tokens;
        let wrapped = labels.into_iter().map(|l| wrap(l, cls, sep)).collect();
        self.fit(wrapped, pad)
    }

    /// Shape every aligned triple into a [`ShapedExample`].
    pub fn shape(&self, aligned: AlignedCorpus) -> Result<Vec<ShapedExample>> {
        let SpecialTokens { cls, sep, pad, .. } = &self.special_tokens;
        let AlignedCorpus {
            sentences,
            labels,
            subtoken_checks,
        } = aligned;
        if subtoken_checks.len() != sentences.len() {
            return Err(TagpieceError::Validation(format!(
                "{} sentences but {} boundary masks",
                sentences.len(),
                subtoken_checks.len()
            )));
        }

        let truncated = sentences.iter().filter(|s| s.len() + 2 > self.max_length).count();
        if truncated > 0 {
            warn!(truncated, max_length = self.max_length, "truncating long sequences");
        }

        let (tokens, labels) = add_special_tokens(sentences, labels, cls, sep)?;
        let checks = subtoken_checks
            .into_iter()
            .map(|c| wrap(c, cls, sep))
            .collect();

        let tokens = self.fit(tokens, pad);
        let labels = self.fit(labels, pad);
        let checks = self.fit(checks, pad);

        Ok(tokens
            .into_iter()
            .zip(labels)
            .zip(checks)
            .map(|((tokens, labels), subtoken_check)| ShapedExample {
                tokens,
                labels,
                subtoken_check,
            })
            .collect())
    }

    /// Shape a single aligned triple.
    pub fn shape_example(
        &self,
        tokens: Vec<String>,
        labels: Vec<String>,
        subtoken_check: Vec<String>,
    ) -> Result<ShapedExample> {
        if labels.len() != tokens.len() || subtoken_check.len() != tokens.len() {
            return Err(TagpieceError::Validation(format!(
                "example streams differ in length: {} tokens, {} labels, {} boundary flags",
                tokens.len(),
                labels.len(),
                subtoken_check.len()
            )));
        }
        let aligned = AlignedCorpus {
            sentences: vec![tokens],
            labels: vec![labels],
            subtoken_checks: vec![subtoken_check],
        };
        self.shape(aligned)?
            .pop()
            .ok_or_else(|| TagpieceError::Validation("shaping produced no example".into()))
    }

    /// Truncate (tail replaced by the configured SEP), then pad.
    fn fit(&self, texts: Vec<Vec<String>>, pad: &str) -> Vec<Vec<String>> {
        let truncated = truncate_with_tail(texts, self.max_length, &self.special_tokens.sep);
        pad_sequence(truncated, self.max_length, pad)
    }
}
