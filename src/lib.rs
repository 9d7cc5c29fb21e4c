//! Paired virtual try-on data: dataset assembly for the try-on generator and
//! the image/mask pair used to train the garment masker.

pub mod dataloader;
pub mod error;
pub mod masker;
pub mod viton;

pub use dataloader::{DataLoader, DataLoaderConfig, Dataset};
pub use error::{DatasetError, Result};
pub use viton::{DatasetConfig, Phase, VitonDataset, VitonSample};
