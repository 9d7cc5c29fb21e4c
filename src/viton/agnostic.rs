//! Cloth-agnostic person representation used by the pose-conditioned models:
//! silhouette, head pixels and one heatmap per body keypoint.

use std::path::Path;

use image::RgbImage;
use ndarray::{s, Array2, Array3, ArrayViewMut2};
use serde::Deserialize;
use tracing::debug;

use crate::error::{DatasetError, Result};

use super::palette::{CLOTH_BACKGROUND, HEAD_COLORS};

/// Resolution the keypoint annotations were made at.
pub const NATIVE_HEIGHT: f32 = 1024.0;
pub const NATIVE_WIDTH: f32 = 768.0;
pub const NUM_KEYPOINTS: usize = 25;
pub const KEYPOINT_RADIUS: i64 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

#[derive(Deserialize)]
struct PoseFile {
    people: Vec<Person>,
}

#[derive(Deserialize)]
struct Person {
    pose_keypoints_2d: Vec<f32>,
}

/// Parses an OpenPose keypoint file. Anything that does not yield at least
/// one complete `(x, y, confidence)` triple for the first person is treated
/// as "no detection" and returns `NUM_KEYPOINTS` zero keypoints.
pub fn parse_keypoints(raw: &[u8]) -> Vec<Keypoint> {
    let parsed = serde_json::from_slice::<PoseFile>(raw)
        .map_err(|e| e.to_string())
        .and_then(|file| {
            let person = file
                .people
                .into_iter()
                .next()
                .ok_or_else(|| "no person detected".to_string())?;
            let flat = person.pose_keypoints_2d;
            if flat.is_empty() || flat.len() % 3 != 0 {
                return Err(format!("{} keypoint values", flat.len()));
            }
            Ok(flat
                .chunks_exact(3)
                .map(|c| Keypoint {
                    x: c[0],
                    y: c[1],
                    confidence: c[2],
                })
                .collect::<Vec<_>>())
        });

    match parsed {
        Ok(keypoints) => keypoints,
        Err(reason) => {
            debug!(%reason, "falling back to empty pose");
            vec![Keypoint::default(); NUM_KEYPOINTS]
        }
    }
}

pub fn load_keypoints(path: &Path) -> Result<Vec<Keypoint>> {
    let raw = std::fs::read(path).map_err(|e| DatasetError::io(path, e))?;
    Ok(parse_keypoints(&raw))
}

/// Maps annotation coordinates onto a `height`×`width` output.
pub fn rescale_keypoints(keypoints: &mut [Keypoint], height: u32, width: u32) {
    let sx = width as f32 / NATIVE_WIDTH;
    let sy = height as f32 / NATIVE_HEIGHT;
    for kp in keypoints.iter_mut() {
        kp.x *= sx;
        kp.y *= sy;
    }
}

/// Fills the square `[x - r, x + r] × [y - r, y + r]` (inclusive, clipped)
/// with 1.0. Centers whose square misses the map entirely, or that are not
/// finite, draw nothing.
pub fn draw_square(map: &mut ArrayViewMut2<f32>, x: f32, y: f32, r: i64) {
    let (h, w) = map.dim();
    let (x, y) = (x.round(), y.round());
    let reach = r as f32;
    if !(-reach..=w as f32 - 1.0 + reach).contains(&x)
        || !(-reach..=h as f32 - 1.0 + reach).contains(&y)
    {
        return;
    }
    let (cx, cy) = (x as i64, y as i64);
    let x0 = (cx - r).max(0);
    let y0 = (cy - r).max(0);
    let x1 = (cx + r).min(w as i64 - 1);
    let y1 = (cy + r).min(h as i64 - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }
    map.slice_mut(s![y0 as usize..=y1 as usize, x0 as usize..=x1 as usize])
        .fill(1.0);
}

/// One heatmap channel per keypoint plus their union. Keypoints with a
/// non-positive coordinate count as undetected and leave their channel empty.
pub fn pose_heatmaps(keypoints: &[Keypoint], height: u32, width: u32) -> (Array3<f32>, Array2<f32>) {
    let (h, w) = (height as usize, width as usize);
    let mut maps = Array3::zeros((keypoints.len(), h, w));
    let mut combined = Array2::zeros((h, w));

    for (i, kp) in keypoints.iter().enumerate() {
        if kp.x <= 0.0 || kp.y <= 0.0 {
            continue;
        }
        draw_square(&mut maps.slice_mut(s![i, .., ..]), kp.x, kp.y, KEYPOINT_RADIUS);
        draw_square(&mut combined.view_mut(), kp.x, kp.y, KEYPOINT_RADIUS);
    }

    (maps, combined)
}

/// Person silhouette from the cloth parse, in {-1, 1}.
pub fn silhouette(cloth_parse: &RgbImage) -> Array2<f32> {
    let (w, h) = cloth_parse.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        if cloth_parse.get_pixel(x as u32, y as u32).0 == CLOTH_BACKGROUND {
            -1.0
        } else {
            1.0
        }
    })
}

pub fn head_mask(cloth_parse: &RgbImage) -> Array2<f32> {
    let (w, h) = cloth_parse.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        let rgb = cloth_parse.get_pixel(x as u32, y as u32).0;
        if HEAD_COLORS.contains(&rgb) {
            1.0
        } else {
            0.0
        }
    })
}

#[derive(Debug, Clone)]
pub struct Agnostic {
    /// `(1 + 3 + K) × H × W`: silhouette, head image, K keypoint heatmaps.
    pub tensor: Array3<f32>,
    /// All keypoint squares drawn into a single channel.
    pub pose_map: Array2<f32>,
}

/// `image` is the normalized CHW identity image, `cloth_parse` the cloth
/// segmentation at the same resolution.
pub fn build_agnostic(
    image: &Array3<f32>,
    cloth_parse: &RgbImage,
    mut keypoints: Vec<Keypoint>,
) -> Result<Agnostic> {
    let (_, h, w) = image.dim();
    let parse_dims = (cloth_parse.height() as usize, cloth_parse.width() as usize);
    if parse_dims != (h, w) {
        return Err(DatasetError::ShapeMismatch {
            expected: (h, w),
            got: parse_dims,
        });
    }

    rescale_keypoints(&mut keypoints, h as u32, w as u32);
    let (heatmaps, pose_map) = pose_heatmaps(&keypoints, h as u32, w as u32);

    let mask = head_mask(cloth_parse);
    let mut head = image.clone();
    for mut channel in head.outer_iter_mut() {
        channel *= &mask;
    }

    let k = heatmaps.dim().0;
    let mut tensor = Array3::zeros((4 + k, h, w));
    tensor.slice_mut(s![0, .., ..]).assign(&silhouette(cloth_parse));
    tensor.slice_mut(s![1..4, .., ..]).assign(&head);
    tensor.slice_mut(s![4.., .., ..]).assign(&heatmaps);

    Ok(Agnostic { tensor, pose_map })
}
