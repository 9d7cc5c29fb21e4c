use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::Array2;
use tracing::{debug, info};

use crate::dataloader::Dataset;
use crate::error::{DatasetError, Result};

use super::agnostic::{self, build_agnostic};
use super::centroid::{Centroid, CentroidCache, CENTROID_LABELS};
use super::config::{DatasetConfig, SegmentationMode};
use super::labels::{self, LabelConverter};
use super::pairs::{self, Phase, SamplePair};
use super::palette;
use super::sample::{ImageTriplet, VitonSample};
use super::segmenter::DenseposeSegmenter;
use super::transforms;

/// Where the mask of removed (garment) pixels comes from.
enum MaskSource {
    /// Derived from the cloth parse while its labels are converted.
    ClothParse { threshold: usize },
    /// Pre-rendered binary asset under `data/mask`.
    MaskAsset,
}

struct BodyLabels {
    centroids: Option<CentroidCache>,
}

/// Paired try-on dataset. Which inputs each sample carries is decided once
/// here from the configuration and phase; `get` only follows that plan.
pub struct VitonDataset {
    config: DatasetConfig,
    phase: Phase,
    data_dir: PathBuf,
    pairs: Vec<SamplePair>,
    height: u32,
    width: u32,
    body_converter: LabelConverter,
    cloth_converter: LabelConverter,
    mask_source: MaskSource,
    body: Option<BodyLabels>,
    densepose: Option<Arc<dyn DenseposeSegmenter>>,
    legacy_pose: bool,
}

impl VitonDataset {
    pub fn new(
        config: DatasetConfig,
        phase: Phase,
        segmenter: Option<Arc<dyn DenseposeSegmenter>>,
    ) -> Result<Self> {
        let config = config.build()?;
        let pairs = pairs::load_pairs(
            &config.dataroot,
            &phase,
            config.pairs.as_deref(),
            config.train_size,
            config.val_size,
        )?;
        let (height, width) = config.dims();

        let mask_source = if config.has(SegmentationMode::Cloth) {
            MaskSource::ClothParse {
                threshold: config.cloth_mask_threshold(),
            }
        } else {
            MaskSource::MaskAsset
        };

        let body = config.has(SegmentationMode::Body).then(|| BodyLabels {
            centroids: (phase == Phase::Train && config.add_pd_loss)
                .then(|| CentroidCache::new(pairs.len(), &CENTROID_LABELS)),
        });

        let densepose = if config.has(SegmentationMode::Densepose) {
            Some(segmenter.ok_or(DatasetError::MissingSegmenter)?)
        } else {
            None
        };

        info!(
            phase = %phase,
            pairs = pairs.len(),
            height,
            width,
            modes = ?config.segmentation,
            "built VitonDataset"
        );

        Ok(VitonDataset {
            data_dir: config.dataroot.join("data"),
            body_converter: LabelConverter::new(palette::body(), config.strict_labels),
            cloth_converter: LabelConverter::new(palette::cloth(), config.strict_labels),
            legacy_pose: config.legacy_pose(),
            config,
            phase,
            pairs,
            height,
            width,
            mask_source,
            body,
            densepose,
        })
    }

    pub fn name(&self) -> &'static str {
        "VitonDataset"
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn pairs(&self) -> &[SamplePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Centroids already computed for `index`, if centroid tracking is on.
    pub fn cached_centroids(&self, index: usize) -> Option<&[Centroid]> {
        self.body
            .as_ref()?
            .centroids
            .as_ref()?
            .get(index)
            .map(Vec::as_slice)
    }

    pub fn get(&self, index: usize) -> Result<VitonSample> {
        let pair = self.pairs.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.pairs.len(),
        })?;
        let (h, w) = (self.height, self.width);

        let raw = open_image(&self.data_path("image", &pair.identity))?;

        // The segmenter sees the photograph as loaded, before any resizing.
        let densepose_label = match &self.densepose {
            Some(segmenter) => Some(labels::with_channel(self.densepose_labels(
                segmenter.as_ref(),
                &raw,
            )?)),
            None => None,
        };

        let image = transforms::resize_area(&raw.to_rgb8(), h, w);
        drop(raw);
        let original_size = (image.height(), image.width());

        let cloth_image = open_image(&self.data_path("cloth", &pair.target))?.to_rgb8();

        let parse_path = self.data_path("image_parse_with_hands", &png_name(&pair.identity));
        let (cloth_label, cloth_parse, mask) = match self.mask_source {
            MaskSource::ClothParse { threshold } => {
                let parse = self.load_parse(&parse_path)?;
                let (cloth_labels, mask) =
                    self.cloth_converter
                        .convert_with_mask(&parse, threshold, &parse_path)?;
                (Some(labels::with_channel(cloth_labels)), Some(parse), mask)
            }
            MaskSource::MaskAsset => {
                let mask_path = self.data_path("mask", &png_name(&pair.identity));
                (None, None, self.load_mask(&mask_path)?)
            }
        };

        let masked = transforms::apply_inverse_mask(&image, &mask);

        let (body_label, label_centroid) = match &self.body {
            Some(body) => {
                let path = self.data_path("image_body_parse", &png_name(&pair.identity));
                let parse = self.load_parse(&path)?;
                let body_labels = self.body_converter.convert(&parse, &path)?;
                let centroids = body
                    .centroids
                    .as_ref()
                    .and_then(|cache| cache.get_or_compute(index, &body_labels))
                    .cloned();
                (Some(labels::with_channel(body_labels)), centroids)
            }
            None => (None, None),
        };

        let image_t = transforms::normalize_chw(&image);
        let masked_t = transforms::normalize_chw(&masked);
        let cloth_t = transforms::normalize_chw(&transforms::resize_bilinear(&cloth_image, h, w));

        let agnostic = if self.legacy_pose {
            let parse = match cloth_parse {
                Some(parse) => parse,
                None => self.load_parse(&parse_path)?,
            };
            let keypoints = agnostic::load_keypoints(
                &self
                    .data_dir
                    .join("pose")
                    .join(pair.identity.replace(".jpg", "_keypoints.json")),
            )?;
            Some(build_agnostic(&image_t, &parse, keypoints)?)
        } else {
            None
        };

        debug!(index, name = %pair.identity, "assembled sample");

        Ok(VitonSample {
            image: ImageTriplet {
                image: image_t,
                cloth: cloth_t,
                masked: masked_t,
            },
            cloth_label,
            body_label,
            densepose_label,
            name: pair.identity.clone(),
            agnostic,
            original_size,
            label_centroid,
        })
    }

    fn data_path(&self, dir: &str, name: &str) -> PathBuf {
        self.data_dir.join(dir).join(name)
    }

    /// Color-coded segmentation resized without mixing colors.
    fn load_parse(&self, path: &Path) -> Result<RgbImage> {
        let parse = open_image(path)?.to_rgb8();
        Ok(transforms::resize_nearest(&parse, self.height, self.width))
    }

    fn load_mask(&self, path: &Path) -> Result<Array2<u8>> {
        let mask: GrayImage = open_image(path)?.to_luma8();
        let mask = transforms::resize_nearest(&mask, self.height, self.width);
        Ok(labels::binary_mask(&mask))
    }

    fn densepose_labels(
        &self,
        segmenter: &dyn DenseposeSegmenter,
        raw: &DynamicImage,
    ) -> Result<Array2<u8>> {
        let labels = segmenter.segment(raw)?;
        let expected = (raw.height() as usize, raw.width() as usize);
        if labels.dim() != expected {
            return Err(DatasetError::ShapeMismatch {
                expected,
                got: labels.dim(),
            });
        }
        Ok(transforms::resize_nearest_labels(&labels, self.height, self.width))
    }
}

impl Dataset for VitonDataset {
    type Item = VitonSample;

    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn get(&self, index: usize) -> Result<VitonSample> {
        VitonDataset::get(self, index)
    }
}

/// Segmentation assets share the photograph's name with a `.png` extension.
fn png_name(name: &str) -> String {
    name.replace(".jpg", ".png")
}

pub(crate) fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => DatasetError::io(path, io),
        other => DatasetError::image(path, other),
    })
}
