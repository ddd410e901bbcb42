//! Tile lists.
use std::path::{Path, PathBuf};

use crate::paths::FileType;
use crate::Result;

/// Point cloud tiles to process. `source` is either a directory, in which case every file with an
/// accepted extension is returned, or a text file with one path per line.
pub fn las_list(source: &Path, accepted: &[FileType]) -> Result<Vec<PathBuf>> {
    if source.is_dir() {
        let mut tiles = Vec::new();
        for entry in std::fs::read_dir(source)? {
            let path = entry?.path();
            let ok = path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| accepted.iter().any(|t| t.extension() == e));
            if ok && path.is_file() {
                tiles.push(path);
            }
        }
        tiles.sort();
        Ok(tiles)
    } else {
        let contents = std::fs::read_to_string(source)?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

/// Label for a canopy cover height interval, e.g. `2-5` or `0-2p5`.
///
/// Bounds print in their shortest form, so a whole number never carries a fraction: `2.0` gives
/// `2`, not `2p0`.
pub fn interval_string(lower: f64, upper: f64) -> String {
    format!("{}-{}", lower, upper).replace('.', "p")
}

#[test]
fn test_interval_string() {
    assert_eq!(interval_string(2.0, 5.0), "2-5");
    assert_eq!(interval_string(0.0, 2.5), "0-2p5");
    assert_eq!(interval_string(1.37, 16.0), "1p37-16");
    assert_eq!(interval_string(2.0, 5.5), "2-5p5");
}

#[test]
fn test_las_list_dir() {
    let dir = tempfile::tempdir().unwrap();
    for name in &["b.laz", "a.las", "c.txt", "d.LAZ"] {
        std::fs::write(dir.path().join(name), "").unwrap();
    }
    std::fs::create_dir(dir.path().join("sub.las")).unwrap();

    let all = las_list(dir.path(), &FileType::ALL).unwrap();
    assert_eq!(all, vec![dir.path().join("a.las"), dir.path().join("b.laz")]);

    let laz = las_list(dir.path(), &[FileType::Laz]).unwrap();
    assert_eq!(laz, vec![dir.path().join("b.laz")]);
}

#[test]
fn test_las_list_file() {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("all_laz.txt");
    std::fs::write(&list, "N:\\t\\a.laz\n  N:\\t\\b.laz  \n\n").unwrap();
    let tiles = las_list(&list, &FileType::ALL).unwrap();
    assert_eq!(
        tiles,
        vec![PathBuf::from(r"N:\t\a.laz"), PathBuf::from(r"N:\t\b.laz")]
    );
}
