use std::sync::OnceLock;

use super::labels::LabelMap;

/// Body labels tracked for the auxiliary centroid loss: both hands and both feet.
pub const CENTROID_LABELS: [u8; 4] = [2, 7, 11, 14];

/// Mean pixel position of one label; `-1` on an axis when the label is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Centroid {
    pub row: i32,
    pub col: i32,
}

impl Centroid {
    pub const MISSING: Centroid = Centroid { row: -1, col: -1 };
}

/// One centroid per tracked label, in the order the labels were requested.
pub type CentroidRecord = Vec<Centroid>;

pub fn label_centroids(labels: &LabelMap, ids: &[u8]) -> CentroidRecord {
    let mut sums = vec![(0u64, 0u64, 0u64); ids.len()];
    for ((row, col), &label) in labels.indexed_iter() {
        for (slot, &id) in sums.iter_mut().zip(ids) {
            if label == id {
                slot.0 += row as u64;
                slot.1 += col as u64;
                slot.2 += 1;
            }
        }
    }

    sums.into_iter()
        .map(|(rows, cols, count)| match count {
            0 => Centroid::MISSING,
            n => Centroid {
                row: (rows / n) as i32,
                col: (cols / n) as i32,
            },
        })
        .collect()
}

/// Write-once centroid record per sample index, sized to the dataset up
/// front. Records live as long as the cache and are never evicted.
///
/// Two workers warming the same index concurrently may both compute the
/// record; only one result is stored and both are identical.
pub struct CentroidCache {
    labels: Vec<u8>,
    cells: Vec<OnceLock<CentroidRecord>>,
}

impl CentroidCache {
    pub fn new(len: usize, labels: &[u8]) -> Self {
        CentroidCache {
            labels: labels.to_vec(),
            cells: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CentroidRecord> {
        self.cells.get(index).and_then(OnceLock::get)
    }

    /// Returns the cached record for `index`, computing it from `labels` on
    /// first access. `None` when `index` is outside the cache.
    pub fn get_or_compute(&self, index: usize, labels: &LabelMap) -> Option<&CentroidRecord> {
        self.cells
            .get(index)
            .map(|cell| cell.get_or_init(|| label_centroids(labels, &self.labels)))
    }
}
