//! In-crate fakes shared by unit tests.

use std::collections::HashMap;

use candle_core::{Device, Tensor};

use crate::config::SpecialTokens;
use crate::error::Result;
use crate::model::SequenceModel;
use crate::tokenizer::{SpecialIds, SubwordTokenizer};

/// Table-driven tokenizer: words split only where a split is registered.
pub struct FakeTokenizer {
    vocab: Vec<String>,
    index: HashMap<String, u32>,
    splits: HashMap<String, Vec<String>>,
    unk: String,
}

impl FakeTokenizer {
    /// Vocabulary: special tokens, the boundary flags, then `words`.
    pub fn new(words: &[&str]) -> Self {
        let specials = SpecialTokens::default();
        let mut tokenizer = Self {
            vocab: Vec::new(),
            index: HashMap::new(),
            splits: HashMap::new(),
            unk: specials.unk.clone(),
        };
        for token in [&specials.pad, &specials.unk, &specials.cls, &specials.sep] {
            tokenizer.add(token);
        }
        tokenizer.add("0");
        tokenizer.add("1");
        for word in words {
            tokenizer.add(word);
        }
        tokenizer
    }

    /// Register `word` as splitting into `pieces` (may be empty).
    pub fn with_split(mut self, word: &str, pieces: &[&str]) -> Self {
        for piece in pieces {
            self.add(piece);
        }
        self.splits
            .insert(word.to_string(), pieces.iter().map(|p| p.to_string()).collect());
        self
    }

    fn add(&mut self, token: &str) {
        if !self.index.contains_key(token) {
            self.index.insert(token.to_string(), self.vocab.len() as u32);
            self.vocab.push(token.to_string());
        }
    }
}

impl SubwordTokenizer for FakeTokenizer {
    fn tokenize(&self, word: &str) -> Result<Vec<String>> {
        if let Some(pieces) = self.splits.get(word) {
            return Ok(pieces.clone());
        }
        if word.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![word.to_string()])
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.index.get(token).copied()
    }

    fn id_to_token(&self, id: u32) -> Option<String> {
        self.vocab.get(id as usize).cloned()
    }

    fn special_ids(&self) -> SpecialIds {
        SpecialIds {
            pad: 0,
            unk: 1,
            cls: 2,
            sep: 3,
        }
    }

    fn unk_token(&self) -> &str {
        &self.unk
    }
}

/// Model whose arg-max at each position is looked up from the input id.
pub struct FixedModel {
    tags: Vec<String>,
    by_token_id: HashMap<u32, usize>,
}

impl FixedModel {
    pub fn new(tags: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            by_token_id: HashMap::new(),
        }
    }

    /// Predict tag `tag_index` wherever `token_id` appears.
    pub fn predicting(mut self, token_id: u32, tag_index: usize) -> Self {
        self.by_token_id.insert(token_id, tag_index);
        self
    }
}

impl SequenceModel for FixedModel {
    fn forward(&self, input_ids: &Tensor, _attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len) = input_ids.dims2()?;
        let ids = input_ids.to_vec2::<u32>()?;
        let num_tags = self.tags.len();
        let mut logits = vec![0f32; batch * seq_len * num_tags];
        for (b, row) in ids.iter().enumerate() {
            for (t, id) in row.iter().enumerate() {
                let winner = self.by_token_id.get(id).copied().unwrap_or(0);
                logits[(b * seq_len + t) * num_tags + winner] = 1.0;
            }
        }
        Ok(Tensor::from_vec(logits, (batch, seq_len, num_tags), &Device::Cpu)?)
    }

    fn idx2tag(&self) -> &[String] {
        &self.tags
    }
}
