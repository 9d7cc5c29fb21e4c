pub mod batch;
pub mod config;
pub mod dataloader;
pub mod for_imagesdir;
pub mod info;
pub mod par_iter;

pub use batch::{Batch, SkippedSample};
pub use config::DataLoaderConfig;
pub use dataloader::{DataLoader, Dataset};
pub use for_imagesdir::list_images;
pub use info::log_dataset_info;
pub use par_iter::BatchIterator;
