use image::DynamicImage;
use ndarray::Array2;

use crate::error::Result;

/// Dense pose surface segmentation provided by an external model.
///
/// Receives the photograph exactly as loaded from disk and returns one
/// label per pixel at the photograph's native resolution.
pub trait DenseposeSegmenter: Send + Sync {
    fn segment(&self, image: &DynamicImage) -> Result<Array2<u8>>;
}

impl<F> DenseposeSegmenter for F
where
    F: Fn(&DynamicImage) -> Result<Array2<u8>> + Send + Sync,
{
    fn segment(&self, image: &DynamicImage) -> Result<Array2<u8>> {
        self(image)
    }
}
