use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::Result;

use super::batch::Batch;
use super::config::DataLoaderConfig;
use super::par_iter::BatchIterator;

/// Indexed, randomly accessible collection of samples.
///
/// `get` must be callable from several worker threads at once.
pub trait Dataset: Send + Sync + 'static {
    type Item: Send + 'static;

    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Result<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: Dataset> Dataset for Arc<D> {
    type Item = D::Item;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Result<Self::Item> {
        (**self).get(index)
    }
}

pub struct DataLoader<D: Dataset> {
    dataset: Arc<D>,
    dataset_indices: Vec<usize>,
    config: DataLoaderConfig,
    rng: Option<StdRng>,
    pool: Arc<rayon::ThreadPool>,
}

impl<D: Dataset> DataLoader<D> {
    pub fn new(dataset: D, config: Option<DataLoaderConfig>) -> Result<Self> {
        Self::from_arc(Arc::new(dataset), config)
    }

    pub fn from_arc(dataset: Arc<D>, config: Option<DataLoaderConfig>) -> Result<Self> {
        let mut config = config.unwrap_or_default().build()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()?;

        let rng = if config.shuffle {
            let seed = *config
                .shuffle_seed
                .get_or_insert_with(|| rand::thread_rng().gen());
            Some(StdRng::seed_from_u64(seed))
        } else {
            None
        };

        let mut loader = DataLoader {
            dataset_indices: (0..dataset.len()).collect(),
            dataset,
            config,
            rng,
            pool: Arc::new(pool),
        };
        loader.shuffle();

        Ok(loader)
    }

    /// Reorders the sample indices. A no-op when shuffling is disabled; each
    /// call continues the seeded stream, so successive epochs differ but stay
    /// reproducible.
    pub fn shuffle(&mut self) {
        if let Some(rng) = self.rng.as_mut() {
            self.dataset_indices.shuffle(rng);
        }
    }

    pub fn batch_indices(&self, batch_number: usize) -> Option<&[usize]> {
        batch_range(
            self.dataset_indices.len(),
            self.config.batch_size,
            self.config.drop_last,
            batch_number,
        )
        .map(|(start, end)| &self.dataset_indices[start..end])
    }

    /// Loads one batch on the worker pool, blocking until every sample is done.
    pub fn load_batch(&self, batch_number: usize) -> Option<Batch<D::Item>> {
        let indices = self.batch_indices(batch_number)?;
        Some(load_indices(&self.pool, &*self.dataset, batch_number, indices))
    }

    pub fn num_batches(&self) -> usize {
        let total = self.dataset_indices.len();
        if self.config.drop_last {
            total / self.config.batch_size
        } else {
            (total + self.config.batch_size - 1) / self.config.batch_size
        }
    }

    /// Prefetching iterator over the batches in the current index order.
    pub fn iter(&self) -> BatchIterator<D::Item> {
        BatchIterator::new(
            Arc::clone(&self.dataset),
            self.dataset_indices.clone(),
            Arc::clone(&self.pool),
            &self.config,
        )
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn get_config(&self) -> &DataLoaderConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.dataset_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset_indices.is_empty()
    }
}

pub(crate) fn batch_range(
    total: usize,
    batch_size: usize,
    drop_last: bool,
    batch_number: usize,
) -> Option<(usize, usize)> {
    let batch_start = batch_number.checked_mul(batch_size)?;
    if batch_start >= total {
        return None;
    }

    let batch_end = (batch_start + batch_size).min(total);
    if drop_last && batch_end - batch_start < batch_size {
        return None;
    }

    Some((batch_start, batch_end))
}

pub(crate) fn load_indices<D: Dataset>(
    pool: &rayon::ThreadPool,
    dataset: &D,
    batch_number: usize,
    indices: &[usize],
) -> Batch<D::Item> {
    let results = pool.install(|| {
        indices
            .par_iter()
            .map(|&idx| (idx, dataset.get(idx)))
            .collect::<Vec<_>>()
    });
    Batch::from_results(batch_number, results)
}
