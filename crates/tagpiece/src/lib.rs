//! # Tagpiece
//!
//! Subword label alignment for named entity recognition.
//!
//! This crate re-exports [`tagpiece_core`]: the CoNLL parser, the subword
//! aligner, sequence shaping, candle batching and the inference projector.
//!
//! ```rust
//! use tagpiece::{LabelMode, PipelineConfig};
//!
//! let config = PipelineConfig::new().with_label_mode(LabelMode::XMode);
//! assert_eq!(config.label_mode.to_string(), "x_mode");
//! ```

pub use tagpiece_core::*;
