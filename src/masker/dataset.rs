use std::path::{Path, PathBuf};

use ndarray::{Array3, Array4, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::dataloader::{list_images, Batch, Dataset};
use crate::error::{DatasetError, Result};
use crate::viton::dataset::open_image;
use crate::viton::{labels, transforms};

/// One photograph and its garment mask at the training resolution.
#[derive(Debug, Clone)]
pub struct MaskerSample {
    /// `3 × H × W` in [0, 1].
    pub image: Array3<f32>,
    /// `1 × H × W` in {0, 1}.
    pub mask: Array3<f32>,
}

/// Photographs from one directory paired with same-stem `.png` masks from
/// another.
pub struct MaskerDataset {
    images: Vec<PathBuf>,
    mask_dir: PathBuf,
    height: u32,
    width: u32,
}

impl MaskerDataset {
    pub fn new(images: Vec<PathBuf>, mask_dir: impl Into<PathBuf>, size: (u32, u32)) -> Self {
        let (height, width) = size;
        MaskerDataset {
            images,
            mask_dir: mask_dir.into(),
            height,
            width,
        }
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn mask_path(&self, image: &Path) -> PathBuf {
        let stem = image.file_stem().unwrap_or_default().to_string_lossy();
        self.mask_dir.join(format!("{stem}.png"))
    }

    pub fn get(&self, index: usize) -> Result<MaskerSample> {
        let path = self.images.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.images.len(),
        })?;

        let image = open_image(path)?.to_rgb8();
        let image = transforms::resize_area(&image, self.height, self.width);

        let mask = open_image(&self.mask_path(path))?.to_luma8();
        let mask = transforms::resize_nearest(&mask, self.height, self.width);
        let mask = labels::binary_mask(&mask).mapv(f32::from).insert_axis(Axis(0));

        Ok(MaskerSample {
            image: transforms::to_unit_chw(&image),
            mask,
        })
    }
}

impl Dataset for MaskerDataset {
    type Item = MaskerSample;

    fn len(&self) -> usize {
        self.images.len()
    }

    fn get(&self, index: usize) -> Result<MaskerSample> {
        MaskerDataset::get(self, index)
    }
}

/// Splits the images of `image_dir` into a train and a test dataset. The split
/// depends only on the sorted file list and `seed`.
pub fn create_masker_dataset_pair(
    image_dir: &Path,
    mask_dir: &Path,
    size: (u32, u32),
    train_fraction: f64,
    seed: u64,
) -> Result<(MaskerDataset, MaskerDataset)> {
    if !(0.0..=1.0).contains(&train_fraction) {
        return Err(DatasetError::InvalidFraction {
            name: "train_size",
            value: train_fraction,
        });
    }
    if !mask_dir.is_dir() {
        return Err(DatasetError::DirectoryNotFound(mask_dir.display().to_string()));
    }

    let mut images = list_images(image_dir)?;
    images.shuffle(&mut StdRng::seed_from_u64(seed));

    let n_train = (images.len() as f64 * train_fraction) as usize;
    let test = images.split_off(n_train);

    info!(
        train = images.len(),
        test = test.len(),
        seed,
        "split masker images"
    );

    Ok((
        MaskerDataset::new(images, mask_dir, size),
        MaskerDataset::new(test, mask_dir, size),
    ))
}

/// Samples of one loader batch stacked along a new leading axis.
#[derive(Debug, Clone)]
pub struct MaskerBatch {
    /// `N × 3 × H × W`
    pub images: Array4<f32>,
    /// `N × 1 × H × W`
    pub masks: Array4<f32>,
}

impl MaskerBatch {
    /// `None` when every sample of the batch was skipped.
    pub fn from_batch(batch: &Batch<MaskerSample>) -> Result<Option<Self>> {
        if batch.is_empty() {
            return Ok(None);
        }
        let images: Vec<_> = batch.samples.iter().map(|s| s.image.view()).collect();
        let masks: Vec<_> = batch.samples.iter().map(|s| s.mask.view()).collect();
        Ok(Some(MaskerBatch {
            images: ndarray::stack(Axis(0), &images)?,
            masks: ndarray::stack(Axis(0), &masks)?,
        }))
    }

    pub fn len(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
