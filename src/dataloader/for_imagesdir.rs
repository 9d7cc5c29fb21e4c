use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};

fn valid_extensions() -> HashSet<String> {
    image::ImageFormat::all()
        .flat_map(|format| format.extensions_str())
        .map(|ext| ext.to_string())
        .collect()
}

fn is_valid_extension(valid_extensions: &HashSet<String>, path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| valid_extensions.contains(&ext.to_lowercase()))
        .unwrap_or(false)
}

/// Lists the image files directly inside `dir`, sorted by file name.
///
/// read_dir does not guarantee any ordering, so sorting keeps seeded splits
/// identical across filesystems.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DatasetError::DirectoryNotFound(dir.display().to_string()));
    }

    let valid_extensions = valid_extensions();
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| DatasetError::io(dir, e))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_valid_extension(&valid_extensions, path))
        .collect();

    if images.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }

    images.sort_unstable();
    Ok(images)
}
