use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver};

use super::batch::Batch;
use super::config::DataLoaderConfig;
use super::dataloader::{batch_range, load_indices, Dataset};

/// Batches are produced on a background thread, at most `prefetch_count`
/// ahead of the consumer. Dropping the iterator stops the producer at its
/// next send.
pub struct BatchIterator<T> {
    receiver: Receiver<Batch<T>>,
}

impl<T: Send + 'static> BatchIterator<T> {
    pub(crate) fn new<D>(
        dataset: Arc<D>,
        dataset_indices: Vec<usize>,
        pool: Arc<rayon::ThreadPool>,
        config: &DataLoaderConfig,
    ) -> Self
    where
        D: Dataset<Item = T>,
    {
        let (sender, receiver) = bounded(config.prefetch_count);
        let batch_size = config.batch_size;
        let drop_last = config.drop_last;

        thread::spawn(move || {
            let mut batch_number = 0;
            while let Some((start, end)) =
                batch_range(dataset_indices.len(), batch_size, drop_last, batch_number)
            {
                let batch = load_indices(
                    &pool,
                    &*dataset,
                    batch_number,
                    &dataset_indices[start..end],
                );
                if sender.send(batch).is_err() {
                    break;
                }
                batch_number += 1;
            }
        });

        BatchIterator { receiver }
    }
}

impl<T> Iterator for BatchIterator<T> {
    type Item = Batch<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}
