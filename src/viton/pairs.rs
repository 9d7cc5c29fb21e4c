use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Split of the pair manifest a dataset is built for. Names outside the
/// built-in set are kept as `Other` and see the whole train manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Phase {
    Train,
    TrainWhole,
    Val,
    Test,
    TestSame,
    Other(String),
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::Train => "train",
            Phase::TrainWhole => "train_whole",
            Phase::Val => "val",
            Phase::Test => "test",
            Phase::TestSame => "test_same",
            Phase::Other(name) => name,
        }
    }

    pub fn default_manifest(&self) -> &'static str {
        match self {
            Phase::Test | Phase::TestSame => "viton_test_pairs.txt",
            _ => "viton_train_pairs.txt",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(DatasetError::UnknownPhase(s.to_string())),
            "train" => Ok(Phase::Train),
            "train_whole" => Ok(Phase::TrainWhole),
            "val" => Ok(Phase::Val),
            "test" => Ok(Phase::Test),
            "test_same" => Ok(Phase::TestSame),
            other => Ok(Phase::Other(other.to_string())),
        }
    }
}

impl TryFrom<String> for Phase {
    type Error = DatasetError;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Person image and the garment to dress it in, both as file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePair {
    pub identity: String,
    pub target: String,
}

/// Same-person target: the `_0` pose/garment variant token becomes `_1`.
pub fn same_person_target(identity: &str) -> String {
    identity.replace("_0", "_1")
}

pub fn parse_manifest(content: &str, source: &Path) -> Result<Vec<SamplePair>> {
    let mut pairs = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [identity, target] => pairs.push(SamplePair {
                identity: identity.to_string(),
                target: target.to_string(),
            }),
            _ => {
                return Err(DatasetError::ManifestRow {
                    path: source.to_path_buf(),
                    line: i + 1,
                    content: line.to_string(),
                })
            }
        }
    }
    Ok(pairs)
}

pub fn read_manifest(path: &Path) -> Result<Vec<SamplePair>> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DatasetError::ManifestNotFound(path.to_path_buf()),
        _ => DatasetError::io(path, e),
    })?;
    parse_manifest(&content, path)
}

fn fraction_len(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).floor() as usize).min(total)
}

/// Phase-specific view of the manifest. `train` keeps the leading
/// `floor(N * train_fraction)` rows, `val` the trailing
/// `floor(N * val_fraction)` rows; the two overlap when the fractions sum to
/// more than one.
pub fn apply_phase(
    mut pairs: Vec<SamplePair>,
    phase: &Phase,
    train_fraction: f64,
    val_fraction: f64,
) -> Vec<SamplePair> {
    match phase {
        Phase::Train => {
            pairs.truncate(fraction_len(pairs.len(), train_fraction));
            pairs
        }
        Phase::Val => {
            let keep = fraction_len(pairs.len(), val_fraction);
            pairs.split_off(pairs.len() - keep)
        }
        Phase::TestSame => {
            for pair in pairs.iter_mut() {
                pair.target = same_person_target(&pair.identity);
            }
            pairs
        }
        Phase::Test | Phase::TrainWhole | Phase::Other(_) => pairs,
    }
}

pub fn manifest_path(root: &Path, phase: &Phase, manifest: Option<&Path>) -> PathBuf {
    root.join(manifest.unwrap_or_else(|| Path::new(phase.default_manifest())))
}

pub fn load_pairs(
    root: &Path,
    phase: &Phase,
    manifest: Option<&Path>,
    train_fraction: f64,
    val_fraction: f64,
) -> Result<Vec<SamplePair>> {
    let path = manifest_path(root, phase, manifest);
    let pairs = read_manifest(&path)?;
    Ok(apply_phase(pairs, phase, train_fraction, val_fraction))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(n: usize) -> Vec<SamplePair> {
        (0..n)
            .map(|i| SamplePair {
                identity: format!("{:03}_0.jpg", i),
                target: format!("{:03}_1.jpg", (i + 1) % n),
            })
            .collect()
    }

    #[test]
    fn phase_round_trips_through_str() {
        for phase in [Phase::Train, Phase::TrainWhole, Phase::Val, Phase::Test, Phase::TestSame] {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
        assert_eq!("eval".parse::<Phase>().unwrap(), Phase::Other("eval".to_string()));
        assert!(matches!(" ".parse::<Phase>(), Err(DatasetError::UnknownPhase(_))));
    }

    #[test]
    fn default_manifest_depends_on_phase() {
        assert_eq!(Phase::Test.default_manifest(), "viton_test_pairs.txt");
        assert_eq!(Phase::TestSame.default_manifest(), "viton_test_pairs.txt");
        assert_eq!(Phase::Val.default_manifest(), "viton_train_pairs.txt");
        assert_eq!(
            manifest_path(Path::new("/data"), &Phase::Train, Some(Path::new("swap.txt"))),
            PathBuf::from("/data/swap.txt")
        );
    }

    #[test]
    fn train_keeps_leading_fraction() {
        let pairs = apply_phase(manifest(10), &Phase::Train, 0.7, 0.1);
        assert_eq!(pairs.len(), 7);
        assert_eq!(pairs[0].identity, "000_0.jpg");
        assert_eq!(pairs[6].identity, "006_0.jpg");
    }

    #[test]
    fn val_keeps_trailing_fraction() {
        let pairs = apply_phase(manifest(10), &Phase::Val, 0.7, 0.25);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].identity, "008_0.jpg");
        assert!(apply_phase(manifest(3), &Phase::Val, 0.7, 0.2).is_empty());
    }

    #[test]
    fn train_and_val_overlap_when_fractions_exceed_one() {
        let train = apply_phase(manifest(10), &Phase::Train, 0.8, 0.4);
        let val = apply_phase(manifest(10), &Phase::Val, 0.8, 0.4);
        let overlap = val.iter().filter(|p| train.contains(p)).count();
        assert_eq!(overlap, 2);
    }

    #[test]
    fn test_phases_keep_everything() {
        assert_eq!(apply_phase(manifest(5), &Phase::Test, 0.1, 0.1), manifest(5));
        assert_eq!(apply_phase(manifest(5), &Phase::TrainWhole, 0.1, 0.1), manifest(5));
    }

    #[test]
    fn unknown_phases_keep_the_train_manifest_whole() {
        let inference: Phase = "inference".parse().unwrap();
        assert_eq!(inference.as_str(), "inference");
        assert_eq!(inference.default_manifest(), "viton_train_pairs.txt");
        assert_eq!(apply_phase(manifest(5), &inference, 0.1, 0.1), manifest(5));
    }

    #[test]
    fn phases_deserialize_from_names() {
        let phases: Vec<Phase> = ron::from_str(r#"["val", "test_same", "inference"]"#).unwrap();
        assert_eq!(
            phases,
            vec![Phase::Val, Phase::TestSame, Phase::Other("inference".to_string())]
        );
        assert!(ron::from_str::<Phase>(r#""""#).is_err());
    }

    #[test]
    fn test_same_targets_the_identity() {
        assert_eq!(same_person_target("001_0.jpg"), "001_1.jpg");
        let pairs = apply_phase(manifest(3), &Phase::TestSame, 0.5, 0.5);
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|p| p.target == p.identity.replace("_0", "_1")));
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let err = parse_manifest("a.jpg b.jpg\nc.jpg\n", Path::new("pairs.txt")).unwrap_err();
        match err {
            DatasetError::ManifestRow { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "c.jpg");
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(parse_manifest("a b c", Path::new("p")).is_err());
    }

    #[test]
    fn manifest_tolerates_blank_lines_and_extra_spacing() {
        let pairs = parse_manifest("a.jpg   b.jpg\n\n\tc.jpg d.jpg\n", Path::new("p")).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].target, "d.jpg");
    }

    #[test]
    fn missing_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_pairs(dir.path(), &Phase::Test, None, 0.8, 0.1),
            Err(DatasetError::ManifestNotFound(_))
        ));
    }
}
