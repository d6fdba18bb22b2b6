//! # Inference Projector
//!
//! Runs a [`SequenceModel`] over tokenized sentences and maps the subword
//! predictions back to one tag per original word.
//!
//! ```text
//! words ──▶ create_test_samples ──▶ InferenceDataset ──▶ DataLoader
//!                                                          │
//!   WordPrediction ◀── project_to_words ◀── idx2tag ◀── argmax(logits)
//! ```

pub mod tags;

pub use tags::{extract_entities, Entity};

use std::sync::Arc;

use candle_core::{Device, D};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::dataset::{Batch, DataLoader, Dataset, InferenceDataset};
use crate::error::{Result, TagpieceError};
use crate::model::SequenceModel;
use crate::preprocess::{SubwordAligner, BOUNDARY_FLAG};
use crate::tokenizer::SubwordTokenizer;

/// Tag used for words that fell beyond the truncation point.
const OUTSIDE_TAG: &str = "O";

/// Word-level prediction for one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPrediction {
    pub words: Vec<String>,
    pub tags: Vec<String>,
    pub entities: Vec<Entity>,
}

/// Model plus tokenizer, configured for one sequence length.
pub struct Inference<M, T> {
    model: M,
    tokenizer: Arc<T>,
    aligner: SubwordAligner,
    max_length: usize,
    batch_size: usize,
    device: Device,
}

impl<M: SequenceModel, T: SubwordTokenizer> Inference<M, T> {
    pub fn new(
        model: M,
        tokenizer: Arc<T>,
        config: &PipelineConfig,
        device: Device,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model,
            tokenizer,
            aligner: SubwordAligner::new(config.label_mode)
                .with_empty_word_policy(config.empty_word_policy),
            max_length: config.max_length,
            batch_size: config.batch_size,
            device,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// Encode one sentence as a batch of one.
    pub fn tokenize_sentence(&self, words: &[String], max_length: usize) -> Result<Batch> {
        let (sentences, checks) = self
            .aligner
            .create_test_samples(std::slice::from_ref(&words.to_vec()), self.tokenizer.as_ref())?;
        let dataset =
            InferenceDataset::new(sentences, checks, Arc::clone(&self.tokenizer), max_length)?;
        Batch::collate(&[dataset.get(0)?], &self.device)
    }

    /// Arg-max tag index at every position of every sample.
    pub fn predict(&self, batch: &Batch) -> Result<Vec<Vec<u32>>> {
        let logits = self.model.forward(&batch.input_ids, &batch.attention_mask)?;
        let predicted = logits.argmax(D::Minus1)?.to_vec2::<u32>()?;
        Ok(predicted)
    }

    /// Map predicted indices to tag strings for every sample.
    pub fn convert_ids_to_entities(&self, predicted: &[Vec<u32>]) -> Result<Vec<Vec<String>>> {
        let idx2tag = self.model.idx2tag();
        predicted
            .iter()
            .map(|sample| {
                sample
                    .iter()
                    .map(|&idx| {
                        idx2tag
                            .get(idx as usize)
                            .cloned()
                            .ok_or(TagpieceError::UnknownTagIndex(idx))
                    })
                    .collect()
            })
            .collect()
    }

    /// Token strings of each sample's input ids.
    pub fn convert_token_id_to_token(&self, batch: &Batch) -> Result<Vec<Vec<String>>> {
        let ids = batch.input_ids.to_vec2::<u32>()?;
        Ok(ids
            .iter()
            .map(|sample| self.tokenizer.convert_ids_to_tokens(sample))
            .collect())
    }

    /// Tag whole sentences and project the results to word level.
    ///
    /// Words cut off by truncation are tagged `O`.
    pub fn predict_words(&self, sentences: &[Vec<String>]) -> Result<Vec<WordPrediction>> {
        let boundary_id = self.tokenizer.token_to_id(BOUNDARY_FLAG).ok_or_else(|| {
            TagpieceError::Tokenizer(format!(
                "boundary flag {BOUNDARY_FLAG:?} is not in the vocabulary"
            ))
        })?;

        let (subwords, checks) = self
            .aligner
            .create_test_samples(sentences, self.tokenizer.as_ref())?;
        let dataset = InferenceDataset::new(
            subwords,
            checks,
            Arc::clone(&self.tokenizer),
            self.max_length,
        )?;
        let loader = DataLoader::new(Arc::new(dataset), self.batch_size, self.device.clone())?;

        let mut predictions = Vec::with_capacity(sentences.len());
        let mut words_iter = sentences.iter();
        for batch in loader.iter(0) {
            let batch = batch?;
            let tags = self.convert_ids_to_entities(&self.predict(&batch)?)?;
            let check_ids = match &batch.subtoken_check {
                Some(check) => check.to_vec2::<u32>()?,
                None => {
                    return Err(TagpieceError::Validation(
                        "inference batch has no boundary mask".into(),
                    ))
                }
            };

            for (sample_tags, sample_checks) in tags.iter().zip(&check_ids) {
                let words = words_iter.next().ok_or_else(|| {
                    TagpieceError::Validation("more predictions than input sentences".into())
                })?;
                let mut word_tags = project_to_words(sample_tags, sample_checks, boundary_id);
                if word_tags.len() < words.len() {
                    debug!(
                        words = words.len(),
                        tagged = word_tags.len(),
                        "sentence truncated, tagging the rest as outside"
                    );
                }
                word_tags.resize(words.len(), OUTSIDE_TAG.to_string());

                predictions.push(WordPrediction {
                    entities: extract_entities(words.as_slice(), word_tags.as_slice()),
                    words: words.clone(),
                    tags: word_tags,
                });
            }
        }

        info!(sentences = predictions.len(), "tagged sentences");
        Ok(predictions)
    }
}

/// Keep the tags at word-initial positions.
///
/// `subtoken_check` holds the encoded boundary mask for the same sample;
/// a position is word-initial when its id equals `boundary_id`.
pub fn project_to_words(tags: &[String], subtoken_check: &[u32], boundary_id: u32) -> Vec<String> {
    tags.iter()
        .zip(subtoken_check)
        .filter(|&(_, &check)| check == boundary_id)
        .map(|(tag, _)| tag.clone())
        .collect()
}
