use tracing::info;

use super::dataloader::{DataLoader, Dataset};

pub fn log_dataset_info<D: Dataset>(name: &str, dl: &DataLoader<D>) {
    let config = dl.get_config();
    let total_size = dl.len();
    let last_batch_size = match total_size % config.batch_size {
        0 if total_size > 0 => config.batch_size,
        rem => rem,
    };

    info!("Dataset Information: {}", name);
    info!("  Total size: {}", total_size);
    info!("  Batch size: {}", config.batch_size);
    info!("  Batches: {}", dl.num_batches());
    info!(
        "  Last batch size: {}{}",
        last_batch_size,
        if config.drop_last && last_batch_size < config.batch_size {
            " (dropped)"
        } else {
            ""
        }
    );
    info!("  Workers: {}, prefetch: {}", config.threads, config.prefetch_count);
    info!("  Shuffle: {}", config.shuffle);
    info!("  Seed: {:?}", config.shuffle_seed);
}
