use std::collections::HashSet;
use std::fs;
use std::path::Path;

use image::{GrayImage, Luma, Rgb, RgbImage};
use tempfile::TempDir;

use viton_data::masker::{
    build_masker_loaders, create_masker_dataset_pair, train_masker, Masker, MaskerBatch,
    MaskerTrainConfig,
};
use viton_data::viton::ImageSize;
use viton_data::DatasetError;

fn masker_tree(n: usize) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    let images = root.path().join("image");
    let masks = root.path().join("mask");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&masks).unwrap();

    for i in 0..n {
        RgbImage::from_pixel(16, 12, Rgb([255, 0, 51]))
            .save(images.join(format!("{i:06}_0.png")))
            .unwrap();
        GrayImage::from_fn(16, 12, |x, _| Luma([if x < 8 { 255 } else { 0 }]))
            .save(masks.join(format!("{i:06}_0.png")))
            .unwrap();
    }
    fs::write(images.join("notes.txt"), "not an image").unwrap();
    root
}

fn split(root: &Path, seed: u64) -> (Vec<String>, Vec<String>) {
    let (train, test) = create_masker_dataset_pair(
        &root.join("image"),
        &root.join("mask"),
        (8, 6),
        0.8,
        seed,
    )
    .unwrap();
    let names = |paths: &[std::path::PathBuf]| {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
    };
    (names(train.images()), names(test.images()))
}

#[test]
fn seeded_split_is_deterministic_and_disjoint() {
    let root = masker_tree(10);
    let (train, test) = split(root.path(), 9750);
    assert_eq!(train.len(), 8);
    assert_eq!(test.len(), 2);

    let all: HashSet<_> = train.iter().chain(test.iter()).collect();
    assert_eq!(all.len(), 10);

    assert_eq!(split(root.path(), 9750), (train, test));
}

#[test]
fn missing_directories_and_empty_dirs_are_errors() {
    let root = tempfile::tempdir().unwrap();
    let err = create_masker_dataset_pair(
        &root.path().join("image"),
        root.path(),
        (8, 6),
        0.8,
        1,
    )
    .err()
    .unwrap();
    assert!(matches!(err, DatasetError::DirectoryNotFound(_)));

    let err = create_masker_dataset_pair(root.path(), root.path(), (8, 6), 0.8, 1)
        .err()
        .unwrap();
    assert!(matches!(err, DatasetError::EmptyDataset));
}

#[test]
fn samples_are_unit_images_with_binary_masks() {
    let root = masker_tree(2);
    let (train, _) = create_masker_dataset_pair(
        &root.path().join("image"),
        &root.path().join("mask"),
        (6, 8),
        1.0,
        3,
    )
    .unwrap();
    let sample = train.get(0).unwrap();
    assert_eq!(sample.image.dim(), (3, 6, 8));
    assert_eq!(sample.mask.dim(), (1, 6, 8));
    assert_eq!(sample.image[[0, 0, 0]], 1.0);
    assert_eq!(sample.image[[1, 0, 0]], 0.0);
    assert_eq!(sample.image[[2, 0, 0]], 0.2);
    assert_eq!(sample.mask[[0, 3, 0]], 1.0);
    assert_eq!(sample.mask[[0, 3, 7]], 0.0);
}

#[derive(Default)]
struct CountingMasker {
    train_steps: usize,
    samples_seen: usize,
}

impl Masker for CountingMasker {
    fn train_step(&mut self, batch: &MaskerBatch, learning_rate: f64) -> viton_data::Result<f64> {
        assert_eq!(learning_rate, 1e-3);
        assert_eq!(batch.images.dim().1, 3);
        self.train_steps += 1;
        self.samples_seen += batch.len();
        Ok(1.0 / self.train_steps as f64)
    }

    fn eval_step(&self, batch: &MaskerBatch) -> viton_data::Result<f64> {
        assert_eq!(batch.masks.dim().1, 1);
        // Loss falls in the second epoch and rises in the third.
        Ok(match self.train_steps {
            0..=2 => 0.5,
            3..=4 => 0.25,
            _ => 0.75,
        })
    }
}

#[test]
fn driver_steps_every_batch_and_tracks_best_epoch() {
    let root = masker_tree(5);
    let config = MaskerTrainConfig {
        image_dir: root.path().join("image"),
        mask_dir: root.path().join("mask"),
        img_size: ImageSize::Dims { height: 8, width: 6 },
        batch_size: 2,
        learning_rate: 1e-3,
        epochs: 3,
        workers: 2,
        ..Default::default()
    }
    .build()
    .unwrap();

    let (mut train, test) = build_masker_loaders(&config).unwrap();
    assert_eq!(train.len(), 4);
    assert_eq!(test.len(), 1);
    assert_eq!(train.num_batches(), 2);

    let mut model = CountingMasker::default();
    let history = train_masker(&mut model, &mut train, &test, &config).unwrap();

    assert_eq!(model.train_steps, 6);
    assert_eq!(model.samples_seen, 12);

    assert_eq!(history.len(), 3);
    assert_eq!(history[0].epoch, 1);
    assert_eq!(history[0].train_loss, 0.75);
    assert_eq!(history[0].test_loss, Some(0.5));
    assert!(history[0].improved);
    assert_eq!(history[1].test_loss, Some(0.25));
    assert!(history[1].improved);
    assert_eq!(history[2].test_loss, Some(0.75));
    assert!(!history[2].improved);
}

struct DivergingMasker;

impl Masker for DivergingMasker {
    fn train_step(&mut self, _: &MaskerBatch, _: f64) -> viton_data::Result<f64> {
        Err(DatasetError::Model("loss is NaN".to_string()))
    }

    fn eval_step(&self, _: &MaskerBatch) -> viton_data::Result<f64> {
        Ok(0.0)
    }
}

#[test]
fn model_errors_stop_training() {
    let root = masker_tree(3);
    let config = MaskerTrainConfig {
        image_dir: root.path().join("image"),
        mask_dir: root.path().join("mask"),
        img_size: ImageSize::Dims { height: 8, width: 6 },
        batch_size: 1,
        epochs: 2,
        workers: 1,
        ..Default::default()
    }
    .build()
    .unwrap();

    let (mut train, test) = build_masker_loaders(&config).unwrap();
    let err = train_masker(&mut DivergingMasker, &mut train, &test, &config).unwrap_err();
    assert!(matches!(err, DatasetError::Model(_)));
}
