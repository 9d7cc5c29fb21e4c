use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DatasetError, Result};

use super::palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationMode {
    Body,
    Cloth,
    Densepose,
}

impl SegmentationMode {
    /// Order of the label groups in the discriminator output.
    pub const ALL: [SegmentationMode; 3] = [
        SegmentationMode::Body,
        SegmentationMode::Cloth,
        SegmentationMode::Densepose,
    ];
}

/// A bare integer is the height; the width follows the 3:4 aspect ratio of
/// the source photographs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSize {
    Height(u32),
    Dims { height: u32, width: u32 },
}

impl ImageSize {
    /// `(height, width)`
    pub fn dims(&self) -> (u32, u32) {
        match *self {
            ImageSize::Height(h) => (h, (h as f64 * 0.75) as u32),
            ImageSize::Dims { height, width } => (height, width),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub dataroot: PathBuf,
    pub img_size: ImageSize,
    pub segmentation: Vec<SegmentationMode>,
    /// Counts the background label as part of the cloth mask.
    pub no_bg: bool,
    pub train_size: f64,
    pub val_size: f64,
    /// Generator identifier; ids containing "old" select the pose-conditioned
    /// agnostic input.
    pub bpgm_id: String,
    /// Track hand/foot centroids for the auxiliary loss (train phase only).
    pub add_pd_loss: bool,
    /// Pair manifest relative to `dataroot`, overriding the phase default.
    pub pairs: Option<PathBuf>,
    /// Fail a sample on segmentation colors missing from the palette instead
    /// of labelling them 0.
    pub strict_labels: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dataroot: PathBuf::from("dataset/viton"),
            img_size: ImageSize::Height(256),
            segmentation: vec![SegmentationMode::Body, SegmentationMode::Cloth],
            no_bg: false,
            train_size: 0.9,
            val_size: 0.1,
            bpgm_id: "256_26_3_viton".to_string(),
            add_pd_loss: false,
            pairs: None,
            strict_labels: false,
        }
    }
}

impl DatasetConfig {
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        ron::from_str(&raw).map_err(|source| DatasetError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn build(self) -> Result<Self> {
        check_fraction("train_size", self.train_size)?;
        check_fraction("val_size", self.val_size)?;
        if self.train_size + self.val_size > 1.0 {
            warn!(
                train = self.train_size,
                val = self.val_size,
                "train and val fractions overlap; some pairs land in both splits"
            );
        }

        let (height, width) = self.img_size.dims();
        if height == 0 || width == 0 {
            return Err(DatasetError::InvalidImageSize { height, width });
        }

        Ok(self)
    }

    pub fn dims(&self) -> (u32, u32) {
        self.img_size.dims()
    }

    pub fn has(&self, mode: SegmentationMode) -> bool {
        self.segmentation.contains(&mode)
    }

    pub fn legacy_pose(&self) -> bool {
        self.bpgm_id.contains("old")
    }

    /// Cloth labels below this index form the mask of removed pixels.
    pub fn cloth_mask_threshold(&self) -> usize {
        palette::CLOTH_MASK_THRESHOLD + usize::from(self.no_bg)
    }

    /// Palette sizes in body, cloth, densepose order.
    pub fn label_nc(&self) -> [usize; 3] {
        [
            palette::body().len(),
            palette::cloth().len(),
            palette::densepose().len(),
        ]
    }

    /// Label counts plus one for the generator's extra class.
    pub fn semantic_nc(&self) -> [usize; 3] {
        self.label_nc().map(|nc| nc + 1)
    }

    /// Start of each label group in the discriminator output; a group takes
    /// `semantic_nc + 1` channels (one more for real/fake). Inactive groups
    /// are 0.
    pub fn offsets(&self) -> [usize; 4] {
        let semantic_nc = self.semantic_nc();
        let mut offsets = [0; 4];
        for (i, mode) in SegmentationMode::ALL.iter().enumerate() {
            offsets[i + 1] = if self.has(*mode) {
                offsets[i] + semantic_nc[i] + 1
            } else {
                0
            };
        }
        offsets
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(DatasetError::InvalidFraction { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_size_expands_to_portrait() {
        assert_eq!(ImageSize::Height(256).dims(), (256, 192));
        assert_eq!(ImageSize::Height(1024).dims(), (1024, 768));
        assert_eq!(ImageSize::Dims { height: 10, width: 20 }.dims(), (10, 20));
    }

    #[test]
    fn offsets_follow_active_modes() {
        let mut config = DatasetConfig {
            segmentation: SegmentationMode::ALL.to_vec(),
            ..Default::default()
        };
        assert_eq!(config.label_nc(), [15, 20, 25]);
        assert_eq!(config.semantic_nc(), [16, 21, 26]);
        assert_eq!(config.offsets(), [0, 17, 39, 66]);

        config.segmentation = vec![SegmentationMode::Body];
        assert_eq!(config.offsets(), [0, 17, 0, 0]);

        config.segmentation = vec![SegmentationMode::Cloth];
        assert_eq!(config.offsets(), [0, 0, 22, 0]);

        config.segmentation.clear();
        assert_eq!(config.offsets(), [0; 4]);
    }

    #[test]
    fn background_flag_moves_mask_threshold() {
        let mut config = DatasetConfig::default();
        assert_eq!(config.cloth_mask_threshold(), 6);
        config.no_bg = true;
        assert_eq!(config.cloth_mask_threshold(), 7);
    }

    #[test]
    fn legacy_pose_is_keyed_on_model_id() {
        let mut config = DatasetConfig::default();
        assert!(!config.legacy_pose());
        config.bpgm_id = "256_3_old".to_string();
        assert!(config.legacy_pose());
    }

    #[test]
    fn build_rejects_bad_fractions_and_sizes() {
        let config = DatasetConfig {
            train_size: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(DatasetError::InvalidFraction { .. })));

        let config = DatasetConfig {
            img_size: ImageSize::Height(1),
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(DatasetError::InvalidImageSize { .. })));

        let overlapping = DatasetConfig {
            train_size: 0.8,
            val_size: 0.4,
            ..Default::default()
        };
        assert!(overlapping.build().is_ok());
    }

    #[test]
    fn parses_ron() {
        let config: DatasetConfig = ron::from_str(
            r#"(
                dataroot: "/data/viton",
                img_size: 512,
                segmentation: [body, densepose],
                no_bg: true,
                add_pd_loss: true,
                pairs: Some("swap_pairs.txt"),
            )"#,
        )
        .unwrap();
        assert_eq!(config.dims(), (512, 384));
        assert!(config.has(SegmentationMode::Densepose));
        assert!(!config.has(SegmentationMode::Cloth));
        assert_eq!(config.pairs, Some(PathBuf::from("swap_pairs.txt")));
        assert_eq!(config.train_size, 0.9);
    }
}
