use crate::error::{DatasetError, Result};

pub struct DataLoaderConfig {
    pub prefetch_count: usize,
    pub batch_size: usize,
    pub threads: usize,
    pub shuffle: bool,
    pub shuffle_seed: Option<u64>,
    pub drop_last: bool,
}

impl DataLoaderConfig {
    pub fn build(self) -> Result<Self> {
        if self.batch_size == 0 {
            return Err(DatasetError::InvalidBatchSize);
        }

        Ok(Self {
            prefetch_count: self.prefetch_count.max(1),
            threads: self.threads.max(1),
            ..self
        })
    }
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            prefetch_count: 4,
            batch_size: 32,
            threads: num_cpus::get(),
            shuffle: true,
            shuffle_seed: None,
            drop_last: false,
        }
    }
}
