use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use serde::Deserialize;
use tracing::info;

use crate::error::{Result, TagpieceError};
use crate::model::SequenceModel;

/// Fields of a Hugging Face token-classification `config.json` that the
/// encoder config does not carry.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    #[serde(default = "default_dim")]
    dim: usize,
    id2label: HashMap<String, String>,
}

fn default_dim() -> usize {
    768
}

/// A transformer token classifier (DistilBERT encoder + linear head).
pub struct TokenClassifier {
    encoder: DistilBertModel,
    classifier: Linear,
    idx2tag: Vec<String>,
}

impl TokenClassifier {
    /// Load `model.safetensors` and `config.json` from `model_dir`.
    pub fn from_dir<P: AsRef<Path>>(model_dir: P, device: &Device) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let weights = model_dir.join("model.safetensors");
        let config_path = model_dir.join("config.json");

        if !weights.exists() {
            return Err(TagpieceError::ModelLoad(format!(
                "weights not found at {}",
                weights.display()
            )));
        }

        let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
            TagpieceError::ModelLoad(format!("failed to read {}: {e}", config_path.display()))
        })?;
        let encoder_config: DistilBertConfig = serde_json::from_str(&config_str)?;
        let head: HeadConfig = serde_json::from_str(&config_str)?;
        let idx2tag = idx2tag_from_labels(&head.id2label)?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device)? };
        let model = Self::load(vb, &encoder_config, head.dim, idx2tag)?;
        info!(
            model_dir = %model_dir.display(),
            num_tags = model.idx2tag.len(),
            "loaded token classifier"
        );
        Ok(model)
    }

    /// Build the model from a var builder.
    pub fn load(
        vb: VarBuilder,
        config: &DistilBertConfig,
        hidden_size: usize,
        idx2tag: Vec<String>,
    ) -> Result<Self> {
        let encoder = DistilBertModel::load(vb.pp("distilbert"), config)?;
        let classifier = candle_nn::linear(hidden_size, idx2tag.len(), vb.pp("classifier"))?;
        Ok(Self {
            encoder,
            classifier,
            idx2tag,
        })
    }
}

impl SequenceModel for TokenClassifier {
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        // the encoder masks out keys flagged with 1; [b, 1, 1, k] broadcasts over heads and queries
        let padding_mask = attention_mask.eq(0u32)?.unsqueeze(1)?.unsqueeze(1)?;
        let hidden_states = self.encoder.forward(input_ids, &padding_mask)?;
        Ok(self.classifier.forward(&hidden_states)?)
    }

    fn idx2tag(&self) -> &[String] {
        &self.idx2tag
    }
}

/// Order an `id2label` map by numeric id. Ids must be exactly `0..n`.
fn idx2tag_from_labels(id2label: &HashMap<String, String>) -> Result<Vec<String>> {
    let mut pairs = id2label
        .iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|id| (id, label.clone()))
                .map_err(|_| TagpieceError::ModelLoad(format!("non-numeric label id {id:?}")))
        })
        .collect::<Result<Vec<_>>>()?;
    pairs.sort_by_key(|(id, _)| *id);

    for (expected, (id, _)) in pairs.iter().enumerate() {
        if *id != expected {
            return Err(TagpieceError::ModelLoad(format!(
                "id2label is not contiguous: missing id {expected}"
            )));
        }
    }
    Ok(pairs.into_iter().map(|(_, label)| label).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idx2tag_ordering() {
        let mut map = HashMap::new();
        map.insert("1".to_string(), "B-PER".to_string());
        map.insert("0".to_string(), "O".to_string());
        map.insert("2".to_string(), "I-PER".to_string());
        assert_eq!(idx2tag_from_labels(&map).unwrap(), vec!["O", "B-PER", "I-PER"]);
    }

    #[test]
    fn test_idx2tag_gap_is_rejected() {
        let mut map = HashMap::new();
        map.insert("0".to_string(), "O".to_string());
        map.insert("2".to_string(), "B-LOC".to_string());
        assert!(matches!(
            idx2tag_from_labels(&map),
            Err(TagpieceError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_missing_weights() {
        let result = TokenClassifier::from_dir("/no/such/model", &Device::Cpu);
        assert!(matches!(result, Err(TagpieceError::ModelLoad(_))));
    }
}
