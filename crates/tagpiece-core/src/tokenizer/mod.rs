//! # Subword Tokenizer Capability
//!
//! The aligner and the datasets only need three things from a tokenizer:
//! split one word into subwords, map pre-split tokens to a fixed-length id
//! vector, and map ids back to token strings. [`SubwordTokenizer`] captures
//! exactly that, with `encode_plus` and `convert_ids_to_tokens` provided on
//! top of the vocabulary primitives.

pub mod hf;

pub use hf::HfTokenizer;

use crate::error::{Result, TagpieceError};

/// Vocabulary ids of the special tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialIds {
    pub cls: u32,
    pub sep: u32,
    pub pad: u32,
    pub unk: u32,
}

/// Options for [`SubwordTokenizer::encode_plus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Target length, special tokens included.
    pub max_length: usize,
    /// Right-pad to `max_length`.
    pub padding: bool,
    /// Cut inputs that would exceed `max_length`.
    pub truncation: bool,
    /// Wrap the sequence in CLS ... SEP.
    pub add_special_tokens: bool,
}

impl EncodeOptions {
    /// Fixed-length encoding: pad, truncate and add special tokens.
    pub fn fixed(max_length: usize) -> Self {
        Self {
            max_length,
            padding: true,
            truncation: true,
            add_special_tokens: true,
        }
    }
}

/// Token ids and attention mask for one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedInput {
    pub input_ids: Vec<u32>,
    /// 1 for real and special tokens, 0 for padding.
    pub attention_mask: Vec<u32>,
}

impl EncodedInput {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// A pluggable subword tokenizer.
pub trait SubwordTokenizer: Send + Sync {
    /// Split a single word into subword strings.
    fn tokenize(&self, word: &str) -> Result<Vec<String>>;

    /// Vocabulary lookup.
    fn token_to_id(&self, token: &str) -> Option<u32>;

    /// Reverse vocabulary lookup.
    fn id_to_token(&self, id: u32) -> Option<String>;

    /// Ids of CLS, SEP, PAD and UNK.
    fn special_ids(&self) -> SpecialIds;

    /// The string used for out-of-vocabulary tokens.
    fn unk_token(&self) -> &str;

    /// Encode an already split token sequence.
    ///
    /// Tokens are looked up directly in the vocabulary (no further
    /// splitting); unknown tokens map to the UNK id.
    fn encode_plus(&self, tokens: &[String], options: EncodeOptions) -> Result<EncodedInput> {
        let special = self.special_ids();
        let reserved = if options.add_special_tokens { 2 } else { 0 };
        if options.truncation && options.max_length < reserved {
            return Err(TagpieceError::Validation(format!(
                "max_length {} cannot hold the special tokens",
                options.max_length
            )));
        }

        let budget = if options.truncation {
            options.max_length - reserved
        } else {
            tokens.len()
        };

        let mut input_ids = Vec::with_capacity(options.max_length.max(tokens.len() + reserved));
        if options.add_special_tokens {
            input_ids.push(special.cls);
        }
        input_ids.extend(
            tokens
                .iter()
                .take(budget)
                .map(|token| self.token_to_id(token).unwrap_or(special.unk)),
        );
        if options.add_special_tokens {
            input_ids.push(special.sep);
        }

        let mut attention_mask = vec![1; input_ids.len()];
        if options.padding && input_ids.len() < options.max_length {
            input_ids.resize(options.max_length, special.pad);
            attention_mask.resize(options.max_length, 0);
        }

        Ok(EncodedInput {
            input_ids,
            attention_mask,
        })
    }

    /// Map ids back to token strings; unknown ids render as the UNK token.
    fn convert_ids_to_tokens(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .map(|&id| {
                self.id_to_token(id)
                    .unwrap_or_else(|| self.unk_token().to_string())
            })
            .collect()
    }
}

impl<T: SubwordTokenizer + ?Sized> SubwordTokenizer for std::sync::Arc<T> {
    fn tokenize(&self, word: &str) -> Result<Vec<String>> {
        (**self).tokenize(word)
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        (**self).token_to_id(token)
    }

    fn id_to_token(&self, id: u32) -> Option<String> {
        (**self).id_to_token(id)
    }

    fn special_ids(&self) -> SpecialIds {
        (**self).special_ids()
    }

    fn unk_token(&self) -> &str {
        (**self).unk_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTokenizer;

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encode_plus_pads_to_max_length() {
        let tokenizer = FakeTokenizer::new(&["hello", "world"]);
        let ids = tokenizer.special_ids();
        let encoded = tokenizer
            .encode_plus(&toks(&["hello", "world"]), EncodeOptions::fixed(6))
            .unwrap();

        assert_eq!(encoded.len(), 6);
        assert_eq!(encoded.input_ids[0], ids.cls);
        assert_eq!(encoded.input_ids[1], tokenizer.token_to_id("hello").unwrap());
        assert_eq!(encoded.input_ids[3], ids.sep);
        assert_eq!(encoded.input_ids[4], ids.pad);
        assert_eq!(encoded.attention_mask, vec![1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_encode_plus_truncates_and_keeps_sep() {
        let tokenizer = FakeTokenizer::new(&["a", "b", "c", "d"]);
        let encoded = tokenizer
            .encode_plus(&toks(&["a", "b", "c", "d"]), EncodeOptions::fixed(4))
            .unwrap();

        assert_eq!(encoded.len(), 4);
        assert_eq!(
            tokenizer.convert_ids_to_tokens(&encoded.input_ids),
            toks(&["[CLS]", "a", "b", "[SEP]"])
        );
        assert_eq!(encoded.attention_mask, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_encode_plus_unknown_token_maps_to_unk() {
        let tokenizer = FakeTokenizer::new(&["known"]);
        let encoded = tokenizer
            .encode_plus(&toks(&["known", "mystery"]), EncodeOptions::fixed(5))
            .unwrap();
        assert_eq!(encoded.input_ids[2], tokenizer.special_ids().unk);
    }

    #[test]
    fn test_encode_plus_without_special_tokens() {
        let tokenizer = FakeTokenizer::new(&["a"]);
        let options = EncodeOptions {
            max_length: 3,
            padding: false,
            truncation: true,
            add_special_tokens: false,
        };
        let encoded = tokenizer.encode_plus(&toks(&["a"]), options).unwrap();
        assert_eq!(encoded.input_ids, vec![tokenizer.token_to_id("a").unwrap()]);
        assert_eq!(encoded.attention_mask, vec![1]);
    }

    #[test]
    fn test_encode_plus_rejects_length_below_specials() {
        let tokenizer = FakeTokenizer::new(&["a"]);
        let result = tokenizer.encode_plus(&toks(&["a"]), EncodeOptions::fixed(1));
        assert!(matches!(result, Err(TagpieceError::Validation(_))));
    }

    #[test]
    fn test_convert_ids_to_tokens_unknown_id() {
        let tokenizer = FakeTokenizer::new(&[]);
        assert_eq!(tokenizer.convert_ids_to_tokens(&[9999]), toks(&["[UNK]"]));
    }
}
