//! Naming conventions of the LiDAR library.
//!
//! The defaults reproduce the layout of the archive on the `N:` share. A TOML file can override any
//! of them, e.g. to add a UTM zone or to point the library at a different root:
//!
//! ```toml
//! default_drive = "M"
//! fusion_install = 'D:\FUSION'
//!
//! [[utm_zones]]
//! central_meridian = -111.0
//! zone = "12"
//! ```
use serde::Deserialize;

use std::path::Path;

use crate::{Error, Result};

/// One row of the central meridian to UTM zone table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UtmZone {
    pub central_meridian: f64,
    pub zone: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Conventions {
    /// Drive holding the shared library.
    pub default_drive: String,
    /// Drive checked for a local mirror of a project's working rasters.
    pub local_drive: String,
    /// Root segment appended to the drive letter.
    pub base_dir: String,
    pub separator: String,
    /// Geodatabase with the tile index and boundary feature classes of every project.
    pub master_index_gdb: String,
    pub default_file_type: String,
    pub tile_buffer: u32,
    pub lookup_file: String,
    pub fusion_install: String,
    pub utm_zones: Vec<UtmZone>,
}

impl Default for Conventions {
    fn default() -> Self {
        Conventions {
            default_drive: "N".to_string(),
            local_drive: "D".to_string(),
            base_dir: r":\LiDAR".to_string(),
            separator: r"\".to_string(),
            master_index_gdb: r"N:\lidar\a_indices\LiDAR_indeces3.gdb".to_string(),
            default_file_type: "laz".to_string(),
            tile_buffer: 31,
            lookup_file: "LiDAR_project_lookup.txt".to_string(),
            fusion_install: r"C:\Fusion".to_string(),
            utm_zones: vec![
                UtmZone {
                    central_meridian: -117.0,
                    zone: "11".to_string(),
                },
                UtmZone {
                    central_meridian: -123.0,
                    zone: "10".to_string(),
                },
            ],
        }
    }
}

impl Conventions {
    /// Read conventions from a TOML file. Keys missing from the file keep their defaults.
    pub fn from_toml(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::ConfigError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                log::debug!("Loading conventions from {}", p.display());
                Conventions::from_toml(p)
            }
            None => Ok(Conventions::default()),
        }
    }

    /// UTM zone code for a Transverse Mercator central meridian.
    pub fn utm_zone(&self, central_meridian: f64) -> Result<&str> {
        self.utm_zones
            .iter()
            .find(|z| z.central_meridian == central_meridian)
            .map(|z| z.zone.as_str())
            .ok_or(Error::UnknownCentralMeridian(central_meridian))
    }
}

#[test]
fn test_default_zones() {
    let conv = Conventions::default();
    assert_eq!(conv.utm_zone(-123.0).unwrap(), "10");
    assert_eq!(conv.utm_zone(-117.0).unwrap(), "11");
    match conv.utm_zone(-111.0) {
        Err(Error::UnknownCentralMeridian(m)) => assert_eq!(m, -111.0),
        other => panic!("expected unknown meridian, got {:?}", other),
    }
}

#[test]
fn test_toml_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conventions.toml");
    std::fs::write(
        &path,
        "default_drive = \"M\"\n\n[[utm_zones]]\ncentral_meridian = -111.0\nzone = \"12\"\n",
    )
    .unwrap();

    let conv = Conventions::from_toml(&path).unwrap();
    assert_eq!(conv.default_drive, "M");
    assert_eq!(conv.local_drive, "D");
    assert_eq!(conv.base_dir, r":\LiDAR");
    assert_eq!(conv.utm_zone(-111.0).unwrap(), "12");
    assert!(conv.utm_zone(-123.0).is_err());
}

#[test]
fn test_bad_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conventions.toml");
    std::fs::write(&path, "tile_buffer = \"wide\"\n").unwrap();
    match Conventions::from_toml(&path) {
        Err(Error::ConfigError { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected config error, got {:?}", other),
    }
}
