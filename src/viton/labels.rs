use std::path::Path;

use image::{GrayImage, RgbImage};
use ndarray::{Array2, Array3, Axis};

use crate::error::{DatasetError, Result};

use super::palette::Palette;

/// Per-pixel label ids, HW.
pub type LabelMap = Array2<u8>;

/// Converts color-coded segmentation images into label maps by exact color
/// match. Pixels whose color is not in the palette keep label 0 unless the
/// converter is strict, in which case they fail the conversion.
#[derive(Clone, Copy)]
pub struct LabelConverter {
    palette: &'static Palette,
    strict: bool,
}

impl LabelConverter {
    pub fn new(palette: &'static Palette, strict: bool) -> Self {
        LabelConverter { palette, strict }
    }

    pub fn palette(&self) -> &'static Palette {
        self.palette
    }

    pub fn convert(&self, img: &RgbImage, source: &Path) -> Result<LabelMap> {
        let (w, h) = img.dimensions();
        let mut labels = LabelMap::zeros((h as usize, w as usize));
        for (x, y, pixel) in img.enumerate_pixels() {
            labels[[y as usize, x as usize]] = self.label_at(pixel.0, x, y, source)?;
        }
        Ok(labels)
    }

    /// Converts and derives the foreground mask in the same pass: labels
    /// below `threshold` are 1, everything else (and unmatched pixels) 0.
    pub fn convert_with_mask(
        &self,
        img: &RgbImage,
        threshold: usize,
        source: &Path,
    ) -> Result<(LabelMap, Array2<u8>)> {
        let (w, h) = img.dimensions();
        let mut labels = LabelMap::zeros((h as usize, w as usize));
        let mut mask = Array2::<u8>::zeros((h as usize, w as usize));
        for (x, y, pixel) in img.enumerate_pixels() {
            let idx = [y as usize, x as usize];
            match self.palette.label_of(pixel.0) {
                Some(label) => {
                    labels[idx] = label;
                    mask[idx] = u8::from((label as usize) < threshold);
                }
                None => {
                    self.unmatched(pixel.0, x, y, source)?;
                }
            }
        }
        Ok((labels, mask))
    }

    #[inline]
    fn label_at(&self, rgb: [u8; 3], x: u32, y: u32, source: &Path) -> Result<u8> {
        match self.palette.label_of(rgb) {
            Some(label) => Ok(label),
            None => self.unmatched(rgb, x, y, source).map(|_| 0),
        }
    }

    #[inline]
    fn unmatched(&self, rgb: [u8; 3], x: u32, y: u32, source: &Path) -> Result<()> {
        if self.strict {
            return Err(DatasetError::UnmatchedColor {
                path: source.to_path_buf(),
                row: y as usize,
                col: x as usize,
                rgb,
            });
        }
        Ok(())
    }
}

/// Number of pixels whose color is missing from `palette`.
pub fn count_unmatched(img: &RgbImage, palette: &Palette) -> usize {
    img.pixels()
        .filter(|p| palette.label_of(p.0).is_none())
        .count()
}

/// Pre-rendered mask asset: any non-zero intensity is foreground.
pub fn binary_mask(img: &GrayImage) -> Array2<u8> {
    let (w, h) = img.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        u8::from(img.get_pixel(x as u32, y as u32)[0] > 0)
    })
}

/// Adds the leading channel dimension the training side expects (1×H×W).
pub fn with_channel(labels: LabelMap) -> Array3<u8> {
    labels.insert_axis(Axis(0))
}

pub fn histogram(labels: &Array3<u8>, num_labels: usize) -> Vec<usize> {
    let mut counts = vec![0; num_labels];
    for &label in labels.iter() {
        if let Some(count) = counts.get_mut(label as usize) {
            *count += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viton::palette::{self, CLOTH_MASK_THRESHOLD};
    use image::{Luma, Rgb};

    fn solid(rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(4, 3, Rgb(rgb))
    }

    #[test]
    fn solid_palette_colors_give_uniform_labels() {
        for palette in [palette::body(), palette::cloth(), palette::densepose()] {
            let converter = LabelConverter::new(palette, true);
            for (i, &color) in palette.colors().iter().enumerate() {
                let labels = converter.convert(&solid(color), Path::new("solid.png")).unwrap();
                assert_eq!(labels.dim(), (3, 4));
                assert!(labels.iter().all(|&l| l as usize == i), "{} {}", palette.name(), i);
            }
        }
    }

    #[test]
    fn unknown_colors_default_to_zero() {
        let mut img = solid(palette::BODY_COLORS[5]);
        img.put_pixel(1, 2, Rgb([1, 2, 3]));
        let labels = LabelConverter::new(palette::body(), false)
            .convert(&img, Path::new("body.png"))
            .unwrap();
        assert_eq!(labels[[2, 1]], 0);
        assert_eq!(labels[[0, 0]], 5);
        assert!(labels.iter().all(|&l| (l as usize) < palette::body().len()));
        assert_eq!(count_unmatched(&img, palette::body()), 1);
    }

    #[test]
    fn strict_mode_reports_first_unmatched_pixel() {
        let mut img = solid(palette::BODY_COLORS[0]);
        img.put_pixel(3, 1, Rgb([1, 2, 3]));
        let err = LabelConverter::new(palette::body(), true)
            .convert(&img, Path::new("body.png"))
            .unwrap_err();
        match err {
            DatasetError::UnmatchedColor { row, col, rgb, .. } => {
                assert_eq!((row, col), (1, 3));
                assert_eq!(rgb, [1, 2, 3]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn cloth_mask_threshold_tracks_background_flag() {
        let converter = LabelConverter::new(palette::cloth(), false);
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb(palette::CLOTH_COLORS[0]));
        img.put_pixel(1, 0, Rgb(palette::CLOTH_BACKGROUND));
        img.put_pixel(2, 0, Rgb(palette::CLOTH_COLORS[7]));

        let (labels, mask) = converter
            .convert_with_mask(&img, CLOTH_MASK_THRESHOLD, Path::new("c.png"))
            .unwrap();
        assert_eq!(labels.row(0).to_vec(), vec![0, 6, 7]);
        assert_eq!(mask.row(0).to_vec(), vec![1, 0, 0]);

        let (_, mask) = converter
            .convert_with_mask(&img, CLOTH_MASK_THRESHOLD + 1, Path::new("c.png"))
            .unwrap();
        assert_eq!(mask.row(0).to_vec(), vec![1, 1, 0]);
    }

    #[test]
    fn mask_asset_is_thresholded_above_zero() {
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(1, 0, Luma([1]));
        img.put_pixel(2, 0, Luma([255]));
        assert_eq!(binary_mask(&img).row(0).to_vec(), vec![0, 1, 1]);
    }

    #[test]
    fn histogram_counts_each_label() {
        let labels = with_channel(ndarray::arr2(&[[0u8, 1], [1, 9]]));
        assert_eq!(labels.dim(), (1, 2, 2));
        assert_eq!(histogram(&labels, 3), vec![1, 2, 0]);
    }
}
