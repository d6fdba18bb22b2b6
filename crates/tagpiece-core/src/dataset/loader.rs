use std::sync::Arc;

use candle_core::Device;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::dataset::{Batch, Dataset, EncodedExample};
use crate::error::{Result, TagpieceError};

/// Iterates a [`Dataset`] in fixed-size batches.
///
/// With shuffling off, examples come out in dataset order. With shuffling on,
/// the order is a seeded Fisher-Yates permutation that changes per epoch.
pub struct DataLoader<D> {
    dataset: Arc<D>,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    pool: Option<ThreadPool>,
    device: Device,
}

impl<D: Dataset> DataLoader<D> {
    pub fn new(dataset: Arc<D>, batch_size: usize, device: Device) -> Result<Self> {
        if batch_size == 0 {
            return Err(TagpieceError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle: false,
            seed: 0,
            pool: None,
            device,
        })
    }

    pub fn with_shuffle(mut self, shuffle: bool, seed: u64) -> Self {
        self.shuffle = shuffle;
        self.seed = seed;
        self
    }

    /// Load examples on a dedicated pool of `num_workers` threads. One worker
    /// loads in the calling thread.
    pub fn with_num_workers(mut self, num_workers: usize) -> Result<Self> {
        self.pool = if num_workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(num_workers)
                .thread_name(|i| format!("tagpiece-loader-{i}"))
                .build()
                .map_err(|e| TagpieceError::InvalidConfig(format!("loader pool: {e}")))?;
            Some(pool)
        } else {
            None
        };
        Ok(self)
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Example order for `epoch`.
    pub fn order(&self, epoch: u64) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            let mut rng = oorandom::Rand64::new(u128::from(self.seed ^ epoch));
            for i in (1..indices.len()).rev() {
                let j = rng.rand_range(0..(i as u64 + 1)) as usize;
                indices.swap(i, j);
            }
        }
        indices
    }

    /// Batches for one epoch.
    pub fn iter(&self, epoch: u64) -> impl Iterator<Item = Result<Batch>> + '_ {
        let order = self.order(epoch);
        debug!(
            epoch,
            examples = order.len(),
            batches = self.num_batches(),
            "starting loader epoch"
        );
        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();
        chunks.into_iter().map(move |chunk| {
            let examples = self.load(&chunk)?;
            Batch::collate(&examples, &self.device)
        })
    }

    fn load(&self, indices: &[usize]) -> Result<Vec<EncodedExample>> {
        match &self.pool {
            Some(pool) => pool.install(|| {
                indices
                    .par_iter()
                    .map(|&i| self.dataset.get(i))
                    .collect::<Result<Vec<_>>>()
            }),
            None => indices.iter().map(|&i| self.dataset.get(i)).collect(),
        }
    }
}
