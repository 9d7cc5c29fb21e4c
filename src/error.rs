use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Error, Debug)]
pub enum DatasetError {
    // IO and decoding
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Pair manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Config error at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    // Dataset contents
    #[error("Malformed manifest row {line} in {path}: {content:?} (expected two fields)")]
    ManifestRow {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("No images found in the dataset")]
    EmptyDataset,

    #[error("Color {rgb:?} at ({row}, {col}) in {path} is not in the palette")]
    UnmatchedColor {
        path: PathBuf,
        row: usize,
        col: usize,
        rgb: [u8; 3],
    },

    #[error("Sample index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Expected a {expected:?} (height, width) map but got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    // Configuration
    #[error("Invalid split fraction for {name}: {value}")]
    InvalidFraction { name: &'static str, value: f64 },

    #[error("Unknown dataset phase: {0}")]
    UnknownPhase(String),

    #[error("Invalid image size {height}x{width}")]
    InvalidImageSize { height: u32, width: u32 },

    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("Densepose segmentation requested but no segmenter was provided")]
    MissingSegmenter,

    // External collaborators
    #[error("Segmenter error: {0}")]
    Segmenter(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl DatasetError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        DatasetError::Image {
            path: path.into(),
            source,
        }
    }
}
