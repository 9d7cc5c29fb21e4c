use std::env;

use anyhow::{Context, Result};
use tracing::{info, warn};

use viton_data::dataloader::log_dataset_info;
use viton_data::viton::labels::{count_unmatched, histogram};
use viton_data::viton::{palette, SegmentationMode};
use viton_data::{DataLoader, DataLoaderConfig, DatasetConfig, Phase, VitonDataset};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let mut config = match args.next() {
        Some(path) => DatasetConfig::from_ron_file(&path)
            .with_context(|| format!("loading dataset config {path}"))?,
        None => DatasetConfig::default(),
    };
    let phase: Phase = args.next().as_deref().unwrap_or("train").parse()?;

    if config.has(SegmentationMode::Densepose) {
        warn!("no densepose model available here; skipping densepose labels");
        config
            .segmentation
            .retain(|mode| *mode != SegmentationMode::Densepose);
    }

    info!("label_nc: {:?}", config.label_nc());
    info!("semantic_nc: {:?}", config.semantic_nc());
    info!("offsets: {:?}", config.offsets());

    let dataset = VitonDataset::new(config, phase, None).context("building dataset")?;
    let name = format!("{} ({})", dataset.name(), dataset.phase());
    let loader = DataLoader::new(
        dataset,
        Some(DataLoaderConfig {
            batch_size: 8,
            shuffle: false,
            ..Default::default()
        }),
    )?;
    log_dataset_info(&name, &loader);

    let body_nc = loader.dataset().config().label_nc()[0];
    let cloth_nc = loader.dataset().config().label_nc()[1];
    let mut body_hist = vec![0usize; body_nc];
    let mut cloth_hist = vec![0usize; cloth_nc];
    let mut loaded = 0;
    let mut skipped = 0;

    for batch in loader.iter() {
        skipped += batch.skipped.len();
        loaded += batch.len();
        for sample in &batch.samples {
            if let Some(labels) = &sample.body_label {
                accumulate(&mut body_hist, &histogram(labels, body_nc));
            }
            if let Some(labels) = &sample.cloth_label {
                accumulate(&mut cloth_hist, &histogram(labels, cloth_nc));
            }
        }
    }

    info!("Loaded {} samples, skipped {}", loaded, skipped);
    report_unmatched(&loader);
    info!("Body label pixels: {:?}", body_hist);
    info!("Cloth label pixels: {:?}", cloth_hist);

    Ok(())
}

/// Counts parse pixels whose color is missing from the matching palette.
fn report_unmatched(loader: &DataLoader<VitonDataset>) {
    let dataset = loader.dataset();
    let data = dataset.config().dataroot.join("data");
    let checks = [
        ("image_body_parse", palette::body()),
        ("image_parse_with_hands", palette::cloth()),
    ];

    for (dir, palette) in checks {
        let mut pixels = 0;
        let mut files = 0;
        for pair in dataset.pairs() {
            let path = data.join(dir).join(pair.identity.replace(".jpg", ".png"));
            match image::open(&path) {
                Ok(img) => {
                    let unmatched = count_unmatched(&img.to_rgb8(), palette);
                    if unmatched > 0 {
                        files += 1;
                        pixels += unmatched;
                    }
                }
                Err(e) => warn!("{}: {}", path.display(), e),
            }
        }
        info!(
            "{} palette: {} unmatched pixels in {} files",
            palette.name(),
            pixels,
            files
        );
    }
}

fn accumulate(total: &mut [usize], counts: &[usize]) {
    for (t, c) in total.iter_mut().zip(counts) {
        *t += c;
    }
}
