//! # Datasets and Batching
//!
//! ```text
//! PreparedData ──▶ NerDataset / InferenceDataset / LstmDataset
//!                        │ get(i) -> EncodedExample
//!                        ▼
//!                   DataLoader ──▶ Batch (candle tensors, [batch, max_length])
//! ```

pub mod batch;
pub mod lstm;
pub mod loader;
pub mod module;
pub mod ner;

pub use batch::Batch;
pub use loader::DataLoader;
pub use lstm::LstmDataset;
pub use module::DataModule;
pub use ner::{InferenceDataset, NerDataset};

use crate::error::Result;

/// One example encoded to fixed-length integer vectors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedExample {
    pub input_ids: Vec<u32>,
    /// 1 for real and special tokens, 0 for padding.
    pub attention_mask: Vec<u32>,
    /// Re-encoded boundary mask, position-aligned with `input_ids`.
    pub subtoken_check: Option<Vec<u32>>,
    /// Target label ids (training and validation only).
    pub target: Option<Vec<u32>>,
}

impl EncodedExample {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Random access over a fixed number of examples.
pub trait Dataset: Send + Sync {
    /// Encode example `index`.
    fn get(&self, index: usize) -> Result<EncodedExample>;

    /// Number of examples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
