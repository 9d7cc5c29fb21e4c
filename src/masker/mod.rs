pub mod dataset;
pub mod trainer;

pub use dataset::{create_masker_dataset_pair, MaskerBatch, MaskerDataset, MaskerSample};
pub use trainer::{build_masker_loaders, train_masker, EpochStats, Masker, MaskerTrainConfig};
