//! Resizing and tensor conversion for images and label maps.
//!
//! Tensors are CHW `f32`; label maps and masks are HW `u8`.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, RgbImage};
use ndarray::{Array2, Array3};

/// Source index sampled by nearest-neighbor resizing for destination index `d`.
#[inline]
fn nearest_index(d: u32, src: u32, dst: u32) -> u32 {
    let s = (d as u64 * src as u64 / dst as u64) as u32;
    s.min(src.saturating_sub(1))
}

/// Nearest-neighbor resize. Never mixes pixel values, so it is safe for
/// color-coded segmentation maps and binary masks.
pub fn resize_nearest<P>(
    img: &ImageBuffer<P, Vec<P::Subpixel>>,
    height: u32,
    width: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    let (w0, h0) = img.dimensions();
    if (w0, h0) == (width, height) {
        return img.clone();
    }
    ImageBuffer::from_fn(width, height, |x, y| {
        *img.get_pixel(nearest_index(x, w0, width), nearest_index(y, h0, height))
    })
}

pub fn resize_nearest_labels(labels: &Array2<u8>, height: u32, width: u32) -> Array2<u8> {
    let (h0, w0) = labels.dim();
    if (h0, w0) == (height as usize, width as usize) {
        return labels.clone();
    }
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        labels[[
            nearest_index(y as u32, h0 as u32, height) as usize,
            nearest_index(x as u32, w0 as u32, width) as usize,
        ]]
    })
}

/// For each destination index, the overlapping source indices and the share
/// of the destination cell each one covers.
fn area_weights(src: u32, dst: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let mut weights = Vec::with_capacity(scale.ceil() as usize + 1);
            let mut s = start.floor() as usize;
            while (s as f64) < end && s < src as usize {
                let lo = start.max(s as f64);
                let hi = end.min(s as f64 + 1.0);
                if hi > lo {
                    weights.push((s, ((hi - lo) / scale) as f32));
                }
                s += 1;
            }
            weights
        })
        .collect()
}

/// Area-averaging resize for photographs. Each output pixel is the mean of
/// the source region it covers, weighted by overlap. Enlarging an axis has no
/// region to average, so that case falls back to bilinear.
pub fn resize_area(img: &RgbImage, height: u32, width: u32) -> RgbImage {
    let (w0, h0) = img.dimensions();
    if (w0, h0) == (width, height) {
        return img.clone();
    }
    if width > w0 || height > h0 {
        return resize_bilinear(img, height, width);
    }

    let xw = area_weights(w0, width);
    let yw = area_weights(h0, height);

    let mut out = RgbImage::new(width, height);
    for (y, row_weights) in yw.iter().enumerate() {
        for (x, col_weights) in xw.iter().enumerate() {
            let mut acc = [0f32; 3];
            for &(sy, wy) in row_weights {
                for &(sx, wx) in col_weights {
                    let p = img.get_pixel(sx as u32, sy as u32);
                    let w = wy * wx;
                    for c in 0..3 {
                        acc[c] += p[c] as f32 * w;
                    }
                }
            }
            out.put_pixel(
                x as u32,
                y as u32,
                image::Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8)),
            );
        }
    }
    out
}

pub fn resize_bilinear(img: &RgbImage, height: u32, width: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// `image * (1 - mask)`: pixels under the mask become black.
pub fn apply_inverse_mask(img: &RgbImage, mask: &Array2<u8>) -> RgbImage {
    debug_assert_eq!(mask.dim(), (img.height() as usize, img.width() as usize));
    let mut out = img.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let keep = 1 - mask[[y as usize, x as usize]].min(1);
        for channel in pixel.0.iter_mut() {
            *channel *= keep;
        }
    }
    out
}

/// Pixel values scaled to [0, 1], CHW.
pub fn to_unit_chw(img: &RgbImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    Array3::from_shape_fn((3, h as usize, w as usize), |(c, y, x)| {
        img.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    })
}

/// Pixel values scaled to [-1, 1], CHW: `(v / 255 - 0.5) / 0.5`.
pub fn normalize_chw(img: &RgbImage) -> Array3<f32> {
    to_unit_chw(img).mapv_into(|x| (x - 0.5) / 0.5)
}
