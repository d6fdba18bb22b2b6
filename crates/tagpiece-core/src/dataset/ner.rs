//! Transformer datasets: subword sentences encoded with the tokenizer.

use std::sync::Arc;

use crate::dataset::{Dataset, EncodedExample};
use crate::error::{Result, TagpieceError};
use crate::indexer::TargetIndexer;
use crate::pipeline::PreparedData;
use crate::tokenizer::{EncodeOptions, EncodedInput, SubwordTokenizer};

/// Training and validation examples with targets.
pub struct NerDataset<T, I> {
    data: PreparedData,
    tokenizer: Arc<T>,
    target_indexer: Arc<I>,
    max_length: usize,
}

impl<T: SubwordTokenizer, I: TargetIndexer> NerDataset<T, I> {
    pub fn new(
        data: PreparedData,
        tokenizer: Arc<T>,
        target_indexer: Arc<I>,
        max_length: usize,
    ) -> Result<Self> {
        data.validate()?;
        Ok(Self {
            data,
            tokenizer,
            target_indexer,
            max_length,
        })
    }

    pub fn data(&self) -> &PreparedData {
        &self.data
    }
}

impl<T: SubwordTokenizer, I: TargetIndexer> Dataset for NerDataset<T, I> {
    fn get(&self, index: usize) -> Result<EncodedExample> {
        let sentence = example_at(&self.data.sentences, index)?;
        let check = example_at(&self.data.subtoken_checks, index)?;
        let labels = example_at(&self.data.labels, index)?;

        let options = EncodeOptions::fixed(self.max_length);
        let EncodedInput {
            input_ids,
            attention_mask,
        } = self.tokenizer.encode_plus(sentence, options)?;
        let subtoken_check = self.tokenizer.encode_plus(check, options)?.input_ids;
        let target = self
            .target_indexer
            .convert_samples_to_indexes(std::slice::from_ref(labels))
            .into_iter()
            .next()
            .unwrap_or_default();

        if target.len() != input_ids.len() {
            return Err(TagpieceError::ShapeMismatch {
                expected: input_ids.len(),
                found: target.len(),
            });
        }

        Ok(EncodedExample {
            input_ids,
            attention_mask,
            subtoken_check: Some(subtoken_check),
            target: Some(target),
        })
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

/// Unlabeled examples for prediction.
pub struct InferenceDataset<T> {
    sentences: Vec<Vec<String>>,
    subtoken_checks: Vec<Vec<String>>,
    tokenizer: Arc<T>,
    max_length: usize,
}

impl<T: SubwordTokenizer> InferenceDataset<T> {
    /// Build from the output of [`create_test_samples`](crate::preprocess::create_test_samples).
    pub fn new(
        sentences: Vec<Vec<String>>,
        subtoken_checks: Vec<Vec<String>>,
        tokenizer: Arc<T>,
        max_length: usize,
    ) -> Result<Self> {
        if sentences.len() != subtoken_checks.len() {
            return Err(TagpieceError::Validation(format!(
                "{} sentences but {} boundary masks",
                sentences.len(),
                subtoken_checks.len()
            )));
        }
        Ok(Self {
            sentences,
            subtoken_checks,
            tokenizer,
            max_length,
        })
    }
}

impl<T: SubwordTokenizer> Dataset for InferenceDataset<T> {
    fn get(&self, index: usize) -> Result<EncodedExample> {
        let options = EncodeOptions::fixed(self.max_length);
        let EncodedInput {
            input_ids,
            attention_mask,
        } = self
            .tokenizer
            .encode_plus(example_at(&self.sentences, index)?, options)?;
        let subtoken_check = self
            .tokenizer
            .encode_plus(example_at(&self.subtoken_checks, index)?, options)?
            .input_ids;

        Ok(EncodedExample {
            input_ids,
            attention_mask,
            subtoken_check: Some(subtoken_check),
            target: None,
        })
    }

    fn len(&self) -> usize {
        self.sentences.len()
    }
}

pub(crate) fn example_at<X>(items: &[X], index: usize) -> Result<&X> {
    items.get(index).ok_or_else(|| {
        TagpieceError::Validation(format!(
            "index {index} out of range for {} examples",
            items.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::indexer::Indexer;
    use crate::pipeline::Preprocessor;
    use crate::testing::FakeTokenizer;

    const CONLL: &str = "Peter _ _ B-PER\nBlackburn _ _ I-PER\n\nEU _ _ B-ORG\n";

    fn tokenizer() -> Arc<FakeTokenizer> {
        Arc::new(FakeTokenizer::new(&["Peter", "EU"]).with_split("Blackburn", &["Black", "##burn"]))
    }

    #[test]
    fn test_ner_dataset_streams_align() {
        let tokenizer = tokenizer();
        let config = PipelineConfig::new().with_max_length(6);
        let prepared = Preprocessor::new(&config)
            .unwrap()
            .prepare(CONLL.lines(), tokenizer.as_ref())
            .unwrap();
        let indexer = Arc::new(Indexer::build(&prepared.labels, "[PAD]", "[UNK]"));
        let dataset = NerDataset::new(prepared, tokenizer.clone(), indexer.clone(), 6).unwrap();

        assert_eq!(dataset.len(), 2);
        let example = dataset.get(0).unwrap();
        assert_eq!(
            tokenizer.convert_ids_to_tokens(&example.input_ids),
            vec!["[CLS]", "Peter", "Black", "##burn", "[SEP]", "[PAD]"]
        );
        assert_eq!(example.attention_mask, vec![1, 1, 1, 1, 1, 0]);
        assert_eq!(
            tokenizer.convert_ids_to_tokens(&example.subtoken_check.unwrap()),
            vec!["[CLS]", "1", "1", "0", "[SEP]", "[PAD]"]
        );
        let target = example.target.unwrap();
        assert_eq!(target.len(), 6);
        assert_eq!(target[0], indexer.get_index("[CLS]"));
        assert_eq!(target[2], indexer.get_index("I-PER"));
        assert_eq!(target[5], 0);
    }

    #[test]
    fn test_ner_dataset_out_of_range() {
        let dataset = NerDataset::new(
            PreparedData::default(),
            tokenizer(),
            Arc::new(Indexer::from_vocab(["[PAD]", "[UNK]"])),
            4,
        )
        .unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.get(0).is_err());
    }

    #[test]
    fn test_inference_dataset_has_no_target() {
        let sentences = vec![vec!["Peter".to_string()]];
        let checks = vec![vec!["1".to_string()]];
        let dataset = InferenceDataset::new(sentences, checks, tokenizer(), 4).unwrap();
        let example = dataset.get(0).unwrap();
        assert!(example.target.is_none());
        assert_eq!(example.len(), 4);
        assert_eq!(example.subtoken_check.unwrap()[1], 5);
    }

    #[test]
    fn test_inference_dataset_ragged_input() {
        let result = InferenceDataset::new(vec![vec![]], vec![], tokenizer(), 4);
        assert!(matches!(result, Err(TagpieceError::Validation(_))));
    }
}
