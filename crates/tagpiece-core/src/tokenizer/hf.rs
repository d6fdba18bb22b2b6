//! Hugging Face `tokenizers` backend for [`SubwordTokenizer`].

use std::path::Path;

use tokenizers::Tokenizer as HfInner;
use tracing::debug;

use crate::config::SpecialTokens;
use crate::error::{Result, TagpieceError};
use crate::tokenizer::{SpecialIds, SubwordTokenizer};

/// Subword tokenizer backed by a `tokenizer.json` file.
pub struct HfTokenizer {
    inner: HfInner,
    special: SpecialIds,
    unk_token: String,
}

impl HfTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file.
    ///
    /// Every special token must be present in the vocabulary.
    pub fn from_file<P: AsRef<Path>>(path: P, special_tokens: &SpecialTokens) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TagpieceError::Tokenizer(format!(
                "tokenizer not found at {}",
                path.display()
            )));
        }
        let inner = HfInner::from_file(path).map_err(|e| TagpieceError::Tokenizer(e.to_string()))?;
        debug!(path = %path.display(), "loaded tokenizer");
        Self::from_tokenizer(inner, special_tokens)
    }

    /// Wrap an already constructed tokenizer.
    ///
    /// Padding and truncation saved with the tokenizer are switched off so
    /// that a single word yields only its own pieces.
    pub fn from_tokenizer(mut inner: HfInner, special_tokens: &SpecialTokens) -> Result<Self> {
        inner
            .with_padding(None)
            .with_truncation(None)
            .map_err(|e| TagpieceError::Tokenizer(format!("failed to reset truncation: {e}")))?;
        let lookup = |token: &str| {
            inner.token_to_id(token).ok_or_else(|| {
                TagpieceError::Tokenizer(format!("special token {token:?} missing from vocabulary"))
            })
        };
        let special = SpecialIds {
            cls: lookup(&special_tokens.cls)?,
            sep: lookup(&special_tokens.sep)?,
            pad: lookup(&special_tokens.pad)?,
            unk: lookup(&special_tokens.unk)?,
        };
        Ok(Self {
            inner,
            special,
            unk_token: special_tokens.unk.clone(),
        })
    }

    /// Number of entries in the vocabulary, added tokens included.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl SubwordTokenizer for HfTokenizer {
    fn tokenize(&self, word: &str) -> Result<Vec<String>> {
        let encoding = self
            .inner
            .encode(word, false)
            .map_err(|e| TagpieceError::Tokenizer(format!("failed to tokenize {word:?}: {e}")))?;
        Ok(encoding.get_tokens().to_vec())
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }

    fn id_to_token(&self, id: u32) -> Option<String> {
        self.inner.id_to_token(id)
    }

    fn special_ids(&self) -> SpecialIds {
        self.special
    }

    fn unk_token(&self) -> &str {
        &self.unk_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenizers::models::wordpiece::WordPiece;
    use tokenizers::{PaddingParams, PaddingStrategy};

    use crate::config::LabelMode;
    use crate::preprocess::tokenize_and_keep_labels;
    use crate::tokenizer::EncodeOptions;

    const VOCAB: [&str; 8] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "hello", "play", "##ing", "1"];

    fn wordpiece(vocab: &[&str]) -> HfInner {
        let vocab = vocab
            .iter()
            .enumerate()
            .map(|(id, token)| (token.to_string(), id as u32))
            .collect();
        let model = WordPiece::builder()
            .vocab(vocab)
            .unk_token("[UNK]".to_string())
            .build()
            .unwrap();
        HfInner::new(model)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_tokenizer_file() {
        let result = HfTokenizer::from_file("/no/such/tokenizer.json", &SpecialTokens::default());
        match result {
            Err(TagpieceError::Tokenizer(msg)) => assert!(msg.contains("not found")),
            _ => panic!("expected a tokenizer error"),
        }
    }

    #[test]
    fn test_tokenize_splits_into_wordpieces() {
        let tokenizer = HfTokenizer::from_tokenizer(wordpiece(&VOCAB), &SpecialTokens::default())
            .unwrap();
        assert_eq!(tokenizer.tokenize("playing").unwrap(), strings(&["play", "##ing"]));
        assert_eq!(tokenizer.tokenize("hello").unwrap(), strings(&["hello"]));
        assert_eq!(tokenizer.vocab_size(), VOCAB.len());
        assert_eq!(
            tokenizer.special_ids(),
            SpecialIds {
                pad: 0,
                unk: 1,
                cls: 2,
                sep: 3,
            }
        );
    }

    #[test]
    fn test_saved_padding_does_not_leak_into_words() {
        let mut inner = wordpiece(&VOCAB);
        inner.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(6),
            pad_id: 0,
            pad_token: "[PAD]".to_string(),
            ..Default::default()
        }));
        let tokenizer = HfTokenizer::from_tokenizer(inner, &SpecialTokens::default()).unwrap();

        assert_eq!(tokenizer.tokenize("hello").unwrap(), strings(&["hello"]));

        let aligned = tokenize_and_keep_labels(
            &[strings(&["hello"])],
            &[strings(&["B-MISC"])],
            &tokenizer,
            LabelMode::Same,
        )
        .unwrap();
        assert_eq!(aligned.sentences[0], strings(&["hello"]));
        assert_eq!(aligned.labels[0], strings(&["B-MISC"]));
        assert_eq!(aligned.subtoken_checks[0], strings(&["1"]));
    }

    #[test]
    fn test_missing_special_token_rejected() {
        let result = HfTokenizer::from_tokenizer(
            wordpiece(&["[PAD]", "[UNK]", "[SEP]", "hello"]),
            &SpecialTokens::default(),
        );
        match result {
            Err(TagpieceError::Tokenizer(msg)) => assert!(msg.contains("[CLS]")),
            _ => panic!("expected a tokenizer error"),
        }
    }

    #[test]
    fn test_encode_plus_on_wordpiece_vocab() {
        let tokenizer = HfTokenizer::from_tokenizer(wordpiece(&VOCAB), &SpecialTokens::default())
            .unwrap();
        let encoded = tokenizer
            .encode_plus(&strings(&["play", "##ing", "zzz"]), EncodeOptions::fixed(7))
            .unwrap();

        assert_eq!(encoded.input_ids, vec![2, 5, 6, 1, 3, 0, 0]);
        assert_eq!(encoded.attention_mask, vec![1, 1, 1, 1, 1, 0, 0]);
        assert_eq!(
            tokenizer.convert_ids_to_tokens(&encoded.input_ids[..5]),
            strings(&["[CLS]", "play", "##ing", "[UNK]", "[SEP]"])
        );
    }
}
