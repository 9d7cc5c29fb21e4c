use tracing::warn;

use crate::error::DatasetError;

pub struct SkippedSample {
    pub index: usize,
    pub reason: String,
}

/// One batch of loaded samples. Samples that failed to load are left out of
/// `samples` and listed in `skipped`, so `samples.len()` may be smaller than
/// the configured batch size.
pub struct Batch<T> {
    pub batch_number: usize,
    pub indices: Vec<usize>,
    pub samples: Vec<T>,
    pub skipped: Vec<SkippedSample>,
}

impl<T> Batch<T> {
    pub fn from_results(
        batch_number: usize,
        results: Vec<(usize, Result<T, DatasetError>)>,
    ) -> Self {
        let mut indices = Vec::with_capacity(results.len());
        let mut samples = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();

        for (index, result) in results {
            match result {
                Ok(sample) => {
                    indices.push(index);
                    samples.push(sample);
                }
                Err(e) => {
                    warn!(batch = batch_number, index, error = %e, "skipping sample");
                    skipped.push(SkippedSample {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Batch {
            batch_number,
            indices,
            samples,
            skipped,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
