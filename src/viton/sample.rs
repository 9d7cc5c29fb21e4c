use ndarray::Array3;

use super::agnostic::Agnostic;
use super::centroid::CentroidRecord;

/// Images normalized to [-1, 1], CHW at the configured resolution.
#[derive(Debug, Clone)]
pub struct ImageTriplet {
    /// The identity photograph.
    pub image: Array3<f32>,
    /// The target garment.
    pub cloth: Array3<f32>,
    /// The identity with the garment region blacked out before normalization.
    pub masked: Array3<f32>,
}

/// Everything the try-on training loop consumes for one pair. Disabled parts
/// are `None`.
#[derive(Debug, Clone)]
pub struct VitonSample {
    pub image: ImageTriplet,
    pub cloth_label: Option<Array3<u8>>,
    pub body_label: Option<Array3<u8>>,
    pub densepose_label: Option<Array3<u8>>,
    pub name: String,
    pub agnostic: Option<Agnostic>,
    /// `(height, width)` of the identity image as handed to the model, i.e.
    /// after resizing to the configured resolution.
    pub original_size: (u32, u32),
    pub label_centroid: Option<CentroidRecord>,
}
