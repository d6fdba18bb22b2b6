//! Word-table dataset for recurrent taggers.

use std::sync::Arc;

use crate::dataset::ner::example_at;
use crate::dataset::{Dataset, EncodedExample};
use crate::error::Result;
use crate::indexer::TargetIndexer;
use crate::preprocess::{create_attention_masks, ShapedExample};

/// Shaped examples encoded through table indexers, no subword tokenizer.
pub struct LstmDataset<I> {
    examples: Vec<ShapedExample>,
    token_indexer: Arc<I>,
    target_indexer: Arc<I>,
    pad_item: String,
}

impl<I: TargetIndexer> LstmDataset<I> {
    pub fn new(
        examples: Vec<ShapedExample>,
        token_indexer: Arc<I>,
        target_indexer: Arc<I>,
        pad_item: impl Into<String>,
    ) -> Self {
        Self {
            examples,
            token_indexer,
            target_indexer,
            pad_item: pad_item.into(),
        }
    }
}

impl<I: TargetIndexer> Dataset for LstmDataset<I> {
    fn get(&self, index: usize) -> Result<EncodedExample> {
        let example = example_at(&self.examples, index)?;
        let tokens = std::slice::from_ref(&example.tokens);

        let input_ids = first(self.token_indexer.convert_samples_to_indexes(tokens));
        let attention_mask = first(create_attention_masks(tokens, &self.pad_item));
        let target = first(
            self.target_indexer
                .convert_samples_to_indexes(std::slice::from_ref(&example.labels)),
        );

        Ok(EncodedExample {
            input_ids,
            attention_mask,
            subtoken_check: None,
            target: Some(target),
        })
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

fn first(rows: Vec<Vec<u32>>) -> Vec<u32> {
    rows.into_iter().next().unwrap_or_default()
}
