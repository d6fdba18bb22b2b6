use std::sync::Arc;

use candle_core::Device;
use tracing::info;

use crate::config::PipelineConfig;
use crate::dataset::{DataLoader, NerDataset};
use crate::error::Result;
use crate::indexer::TargetIndexer;
use crate::pipeline::PreparedData;
use crate::tokenizer::SubwordTokenizer;

/// Train and validation splits with their loaders.
///
/// There is no separate test split: the test loader iterates the validation
/// data.
pub struct DataModule<T, I> {
    train: Arc<NerDataset<T, I>>,
    val: Arc<NerDataset<T, I>>,
    config: PipelineConfig,
    device: Device,
}

impl<T: SubwordTokenizer, I: TargetIndexer> DataModule<T, I> {
    pub fn new(
        train: PreparedData,
        val: PreparedData,
        tokenizer: Arc<T>,
        target_indexer: Arc<I>,
        config: PipelineConfig,
        device: Device,
    ) -> Result<Self> {
        config.validate()?;
        let train = NerDataset::new(
            train,
            Arc::clone(&tokenizer),
            Arc::clone(&target_indexer),
            config.max_length,
        )?;
        let val = NerDataset::new(val, tokenizer, target_indexer, config.max_length)?;
        info!(
            train = train.data().len(),
            val = val.data().len(),
            batch_size = config.batch_size,
            "data module ready"
        );
        Ok(Self {
            train: Arc::new(train),
            val: Arc::new(val),
            config,
            device,
        })
    }

    pub fn train_dataloader(&self) -> Result<DataLoader<NerDataset<T, I>>> {
        self.loader(&self.train, self.config.shuffle_train)
    }

    pub fn val_dataloader(&self) -> Result<DataLoader<NerDataset<T, I>>> {
        self.loader(&self.val, false)
    }

    pub fn test_dataloader(&self) -> Result<DataLoader<NerDataset<T, I>>> {
        self.val_dataloader()
    }

    fn loader(
        &self,
        dataset: &Arc<NerDataset<T, I>>,
        shuffle: bool,
    ) -> Result<DataLoader<NerDataset<T, I>>> {
        DataLoader::new(Arc::clone(dataset), self.config.batch_size, self.device.clone())?
            .with_shuffle(shuffle, self.config.seed)
            .with_num_workers(self.config.num_workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::indexer::Indexer;
    use crate::pipeline::Preprocessor;
    use crate::testing::FakeTokenizer;

    #[test]
    fn test_loaders_share_validation_split() {
        let tokenizer = Arc::new(FakeTokenizer::new(&["a", "b", "c"]));
        let config = PipelineConfig::new().with_max_length(4).with_batch_size(2);
        let pre = Preprocessor::new(&config).unwrap();

        let train = pre
            .prepare("a _ _ O\n\nb _ _ B-LOC\n\nc _ _ O\n".lines(), tokenizer.as_ref())
            .unwrap();
        let val = pre.prepare("c _ _ O\n".lines(), tokenizer.as_ref()).unwrap();
        let indexer = Arc::new(Indexer::build(&train.labels, "[PAD]", "[UNK]"));

        let module = DataModule::new(train, val, tokenizer, indexer, config, Device::Cpu).unwrap();

        let train_loader = module.train_dataloader().unwrap();
        assert_eq!(train_loader.dataset().len(), 3);
        assert_eq!(train_loader.num_batches(), 2);

        let test_loader = module.test_dataloader().unwrap();
        assert_eq!(test_loader.dataset().len(), 1);
        let batch = test_loader.iter(0).next().unwrap().unwrap();
        assert_eq!(batch.seq_len(), 4);
        assert!(batch.target.is_some());
    }
}
