use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataloader::{log_dataset_info, DataLoader, DataLoaderConfig};
use crate::error::{DatasetError, Result};
use crate::viton::ImageSize;

use super::dataset::{create_masker_dataset_pair, MaskerBatch, MaskerDataset};

/// The model being trained. Implementations own their optimizer state.
pub trait Masker {
    /// One optimization step; returns the batch loss.
    fn train_step(&mut self, batch: &MaskerBatch, learning_rate: f64) -> Result<f64>;

    /// Loss on a batch without updating the model.
    fn eval_step(&self, batch: &MaskerBatch) -> Result<f64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskerTrainConfig {
    pub image_dir: PathBuf,
    pub mask_dir: PathBuf,
    pub img_size: ImageSize,
    pub train_size: f64,
    pub seed: u64,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    /// Loader worker threads per split.
    pub workers: usize,
}

impl Default for MaskerTrainConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("dataset/viton/data/image"),
            mask_dir: PathBuf::from("dataset/viton/data/mask"),
            img_size: ImageSize::Dims {
                height: 1024,
                width: 768,
            },
            train_size: 0.8,
            seed: 9750,
            batch_size: 2,
            learning_rate: 1e-4,
            epochs: 100,
            workers: 4,
        }
    }
}

impl MaskerTrainConfig {
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        ron::from_str(&raw).map_err(|source| DatasetError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn build(self) -> Result<Self> {
        if !(0.0..=1.0).contains(&self.train_size) {
            return Err(DatasetError::InvalidFraction {
                name: "train_size",
                value: self.train_size,
            });
        }
        if self.batch_size == 0 {
            return Err(DatasetError::InvalidBatchSize);
        }
        let (height, width) = self.img_size.dims();
        if height == 0 || width == 0 {
            return Err(DatasetError::InvalidImageSize { height, width });
        }
        Ok(Self {
            workers: self.workers.max(1),
            ..self
        })
    }

    fn loader_config(&self, shuffle: bool) -> DataLoaderConfig {
        DataLoaderConfig {
            batch_size: self.batch_size,
            threads: self.workers,
            shuffle,
            shuffle_seed: shuffle.then_some(self.seed),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f64,
    /// `None` when the test split is empty.
    pub test_loss: Option<f64>,
    /// Whether this epoch reached the lowest loss so far, judged on the test
    /// loss when there is one.
    pub improved: bool,
}

/// Builds the shuffled train loader and the ordered test loader.
pub fn build_masker_loaders(
    config: &MaskerTrainConfig,
) -> Result<(DataLoader<MaskerDataset>, DataLoader<MaskerDataset>)> {
    let (train, test) = create_masker_dataset_pair(
        &config.image_dir,
        &config.mask_dir,
        config.img_size.dims(),
        config.train_size,
        config.seed,
    )?;

    let train = DataLoader::new(train, Some(config.loader_config(true)))?;
    let test = DataLoader::new(test, Some(config.loader_config(false)))?;
    log_dataset_info("masker train", &train);
    log_dataset_info("masker test", &test);

    Ok((train, test))
}

/// Runs `config.epochs` epochs of training followed by evaluation. Saving the
/// model is left to the caller, which can watch `EpochStats::improved`.
pub fn train_masker<M: Masker>(
    model: &mut M,
    train: &mut DataLoader<MaskerDataset>,
    test: &DataLoader<MaskerDataset>,
    config: &MaskerTrainConfig,
) -> Result<Vec<EpochStats>> {
    let mut history = Vec::with_capacity(config.epochs);
    let mut best = f64::INFINITY;

    for epoch in 0..config.epochs {
        if epoch > 0 {
            train.shuffle();
        }

        let mut train_loss = MeanLoss::default();
        for batch in train.iter() {
            if let Some(batch) = MaskerBatch::from_batch(&batch)? {
                let loss = model.train_step(&batch, config.learning_rate)?;
                debug!(epoch = epoch + 1, batch = train_loss.count + 1, loss, "train step");
                train_loss.add(loss);
            }
        }

        let mut test_loss = MeanLoss::default();
        for batch in test.iter() {
            if let Some(batch) = MaskerBatch::from_batch(&batch)? {
                test_loss.add(model.eval_step(&batch)?);
            }
        }

        let train_loss = train_loss.mean().unwrap_or(f64::NAN);
        let test_loss = test_loss.mean();
        let score = test_loss.unwrap_or(train_loss);
        let improved = score < best;
        if improved {
            best = score;
        }

        info!(
            "Epoch: {}/{}, Train Loss: {:.6}, Test Loss: {}{}",
            epoch + 1,
            config.epochs,
            train_loss,
            test_loss.map_or_else(|| "-".to_string(), |l| format!("{l:.6}")),
            if improved { " (best)" } else { "" }
        );

        history.push(EpochStats {
            epoch: epoch + 1,
            train_loss,
            test_loss,
            improved,
        });
    }

    Ok(history)
}

#[derive(Default)]
struct MeanLoss {
    total: f64,
    count: usize,
}

impl MeanLoss {
    fn add(&mut self, loss: f64) {
        self.total += loss;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }
}
