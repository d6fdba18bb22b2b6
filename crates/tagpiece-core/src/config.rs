//! # Pipeline Configuration
//!
//! One explicit configuration struct handed to every stage by the
//! composition root. Loadable from JSON, every field has a default.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TagpieceError};

/// Sentinel tag assigned to continuation subwords under [`LabelMode::XMode`].
pub const X_TAG: &str = "X";

/// Policy for distributing a word's tag over its subwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LabelMode {
    /// Every subword carries the word's tag.
    #[default]
    #[serde(rename = "same")]
    Same,
    /// The first subword carries the tag, continuations carry [`X_TAG`].
    #[serde(rename = "x_mode")]
    XMode,
}

impl fmt::Display for LabelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Same => write!(f, "same"),
            Self::XMode => write!(f, "x_mode"),
        }
    }
}

impl std::str::FromStr for LabelMode {
    type Err = TagpieceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "same" => Ok(Self::Same),
            "x_mode" => Ok(Self::XMode),
            other => Err(TagpieceError::InvalidConfig(format!(
                "unknown label mode {other:?} (expected \"same\" or \"x_mode\")"
            ))),
        }
    }
}

/// What to do when the tokenizer yields no subwords for a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyWordPolicy {
    /// Abort with [`TagpieceError::DegenerateTokenization`].
    #[default]
    Fail,
    /// Substitute a single unknown-token subword.
    Unknown,
}

/// Special token strings shared by the shaper and the tokenizer adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialTokens {
    pub cls: String,
    pub sep: String,
    pub pad: String,
    pub unk: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            cls: "[CLS]".into(),
            sep: "[SEP]".into(),
            pad: "[PAD]".into(),
            unk: "[UNK]".into(),
        }
    }
}

/// Configuration for the preparation and inference pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fixed sequence length after shaping, special tokens included.
    pub max_length: usize,
    /// Number of examples per batch.
    pub batch_size: usize,
    /// Label distribution policy for subwords.
    pub label_mode: LabelMode,
    /// Handling of words the tokenizer cannot split.
    pub empty_word_policy: EmptyWordPolicy,
    /// Special token strings.
    pub special_tokens: SpecialTokens,
    /// Worker threads used for example loading (1 = inline).
    pub num_workers: usize,
    /// Whether the training loader shuffles each epoch.
    pub shuffle_train: bool,
    /// Seed for shuffling.
    pub seed: u64,
    /// Whether a final sentence without a terminating blank line is kept.
    pub keep_trailing_sentence: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_length: 128,
            batch_size: 32,
            label_mode: LabelMode::Same,
            empty_word_policy: EmptyWordPolicy::Fail,
            special_tokens: SpecialTokens::default(),
            num_workers: 1,
            shuffle_train: true,
            seed: 42,
            keep_trailing_sentence: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = crate::io::read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the fixed sequence length.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the label mode.
    pub fn with_label_mode(mut self, mode: LabelMode) -> Self {
        self.label_mode = mode;
        self
    }

    /// Set the empty-word policy.
    pub fn with_empty_word_policy(mut self, policy: EmptyWordPolicy) -> Self {
        self.empty_word_policy = policy;
        self
    }

    /// Set the number of loader workers (at least one).
    pub fn with_num_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers.max(1);
        self
    }

    /// Enable or disable shuffling of the training split.
    pub fn with_shuffle_train(mut self, shuffle: bool) -> Self {
        self.shuffle_train = shuffle;
        self
    }

    /// Set the shuffle seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Keep or drop a trailing sentence without a blank terminator.
    pub fn with_keep_trailing_sentence(mut self, keep: bool) -> Self {
        self.keep_trailing_sentence = keep;
        self
    }

    /// Check value ranges.
    ///
    /// `max_length` must leave room for the two boundary tokens.
    pub fn validate(&self) -> Result<()> {
        if self.max_length < 2 {
            return Err(TagpieceError::InvalidConfig(format!(
                "max_length must be at least 2, got {}",
                self.max_length
            )));
        }
        if self.batch_size == 0 {
            return Err(TagpieceError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        if self.num_workers == 0 {
            return Err(TagpieceError::InvalidConfig(
                "num_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_length, 128);
        assert_eq!(config.label_mode, LabelMode::Same);
        assert_eq!(config.special_tokens.cls, "[CLS]");
    }

    #[test]
    fn test_builder_methods() {
        let config = PipelineConfig::new()
            .with_max_length(64)
            .with_batch_size(8)
            .with_label_mode(LabelMode::XMode)
            .with_num_workers(0)
            .with_shuffle_train(false)
            .with_keep_trailing_sentence(false);

        assert_eq!(config.max_length, 64);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.label_mode, LabelMode::XMode);
        assert_eq!(config.num_workers, 1);
        assert!(!config.shuffle_train);
        assert!(!config.keep_trailing_sentence);
    }

    #[test]
    fn test_validate_rejects_tiny_max_length() {
        let config = PipelineConfig::new().with_max_length(1);
        assert!(matches!(
            config.validate(),
            Err(TagpieceError::InvalidConfig(_))
        ));
        let config = PipelineConfig::new().with_batch_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"max_length": 256, "label_mode": "x_mode"}"#).unwrap();
        assert_eq!(config.max_length, 256);
        assert_eq!(config.label_mode, LabelMode::XMode);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.empty_word_policy, EmptyWordPolicy::Fail);
    }

    #[test]
    fn test_label_mode_parse() {
        assert_eq!("same".parse::<LabelMode>().unwrap(), LabelMode::Same);
        assert_eq!("x_mode".parse::<LabelMode>().unwrap(), LabelMode::XMode);
        assert!("bio".parse::<LabelMode>().is_err());
        assert_eq!(LabelMode::XMode.to_string(), "x_mode");
    }
}
