pub mod agnostic;
pub mod centroid;
pub mod config;
pub mod dataset;
pub mod labels;
pub mod pairs;
pub mod palette;
pub mod sample;
pub mod segmenter;
pub mod transforms;

pub use agnostic::{Agnostic, Keypoint};
pub use centroid::{Centroid, CentroidCache, CentroidRecord, CENTROID_LABELS};
pub use config::{DatasetConfig, ImageSize, SegmentationMode};
pub use dataset::VitonDataset;
pub use labels::{LabelConverter, LabelMap};
pub use pairs::{Phase, SamplePair};
pub use palette::{Palette, Rgb};
pub use sample::{ImageTriplet, VitonSample};
pub use segmenter::DenseposeSegmenter;
