//! # Sequence Model Capability
//!
//! Anything that maps a batch of token ids to per-position tag logits.

pub mod classifier;

pub use classifier::TokenClassifier;

use candle_core::Tensor;

use crate::error::Result;

/// A token-classification model.
pub trait SequenceModel: Send + Sync {
    /// Compute logits of shape `[batch, seq_len, num_tags]`.
    ///
    /// `input_ids` and `attention_mask` are `[batch, seq_len]` u32 tensors.
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor>;

    /// Index-to-tag lookup table.
    fn idx2tag(&self) -> &[String];

    /// Number of output tags.
    fn num_tags(&self) -> usize {
        self.idx2tag().len()
    }
}
