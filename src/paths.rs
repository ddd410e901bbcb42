//! Project paths in the LiDAR library.
use serde::Serialize;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::Conventions;
use crate::lookup::{Location, LocationLookup};
use crate::spatial::SpatialCatalog;
use crate::{Error, Result};

/// Subset name covering every tile of a project.
pub const ALL_TILES: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Las,
    Laz,
}

impl FileType {
    pub const ALL: [FileType; 2] = [FileType::Las, FileType::Laz];

    pub fn extension(self) -> &'static str {
        match self {
            FileType::Las => "las",
            FileType::Laz => "laz",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "las" => Ok(FileType::Las),
            "laz" => Ok(FileType::Laz),
            _ => Err(Error::InvalidFileType(s.to_string())),
        }
    }
}

/// Answers whether a directory is reachable. Unmounted drives are simply absent.
pub trait Mounts {
    fn is_present(&self, path: &str) -> bool;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMounts;

impl Mounts for LocalMounts {
    fn is_present(&self, path: &str) -> bool {
        std::fs::metadata(Path::new(path)).is_ok()
    }
}

impl<F: Fn(&str) -> bool> Mounts for F {
    fn is_present(&self, path: &str) -> bool {
        self(path)
    }
}

/// Optional settings for [Library::resolve]. Unset fields take the library defaults.
#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    pub drive: Option<String>,
    pub file_type: Option<FileType>,
    pub subset: Option<String>,
    pub tile_buffer: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDirs {
    pub root: String,
    pub dtm: String,
    pub dtm_bare_earth: String,
    pub dtm_canopy: String,
    pub points: String,
    pub points_bare_earth: String,
    pub points_full_cloud: String,
    pub points_tiled_las: String,
    pub points_tiled_laz: String,
    pub stats: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalDirs {
    pub root: String,
    pub vectors: String,
    pub vectors_tao: String,
    pub vectors_gdb: String,
    pub rasters: String,
    pub rasters_bare_earth: String,
    pub rasters_bare_earth_working: String,
    pub rasters_canopy: String,
    pub rasters_canopy_working: String,
    pub rasters_canopy_derivatives: String,
    pub rasters_intensity: String,
    pub rasters_intensity_working: String,
    pub rasters_stats: String,
    pub rasters_qaqc: String,
}

/// Text files listing the tiles of a subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListFiles {
    pub las: String,
    pub bare_earth_dtm: String,
    pub tiled_las: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureClasses {
    pub index: String,
    pub index_retiled: String,
    pub boundary: String,
    pub projection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionInfo {
    /// UTM zone, "0" when the project is not in a Transverse Mercator projection.
    pub utm_zone: String,
    pub wkt: String,
}

/// Paths and naming conventions of a single project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryPaths {
    name: String,
    drive: String,
    file_type: FileType,
    subset: String,
    tile_buffer: u32,
    project_path: String,
    projection_code: String,
    use_local: bool,
    raw: RawDirs,
    #[serde(rename = "final")]
    final_: FinalDirs,
    lists: ListFiles,
    feature_classes: FeatureClasses,
    projection: Option<ProjectionInfo>,
    #[serde(skip)]
    network_working: (String, String),
}

/// Library conventions together with the project lookup.
#[derive(Debug, Clone)]
pub struct Library {
    conventions: Conventions,
    lookup: LocationLookup,
}

impl Library {
    pub fn new(conventions: Conventions, lookup: LocationLookup) -> Self {
        Library {
            conventions,
            lookup,
        }
    }

    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    pub fn lookup(&self) -> &LocationLookup {
        &self.lookup
    }

    /// Root directory of `project` on `drive`, along with its lookup entry.
    pub fn project_path(&self, project: &str, drive: &str) -> Result<(String, &Location)> {
        let location = self.lookup.get(project)?;
        let sep = &self.conventions.separator;
        let path = format!(
            "{}{}{}{}{}{}",
            drive, self.conventions.base_dir, sep, location.forest, sep, project
        );
        Ok((path, location))
    }

    pub fn resolve(
        &self,
        project: &str,
        options: &ProjectOptions,
        catalog: &dyn SpatialCatalog,
        mounts: &dyn Mounts,
    ) -> Result<LibraryPaths> {
        let conv = &self.conventions;
        let sep = conv.separator.as_str();

        let drive = options
            .drive
            .clone()
            .unwrap_or_else(|| conv.default_drive.clone());
        let file_type = match options.file_type {
            Some(t) => t,
            None => conv.default_file_type.parse()?,
        };
        let subset = match options.subset.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => ALL_TILES.to_string(),
        };
        let tile_buffer = options.tile_buffer.unwrap_or(conv.tile_buffer);

        let (project_path, location) = self.project_path(project, &drive)?;
        let p = format!("{}{}", project_path, sep);
        let dir = |parent: &str, name: &str| format!("{}{}{}", parent, name, sep);

        let raw_root = dir(&p, "Raw");
        let dtm = dir(&raw_root, "DTM");
        let points = dir(&raw_root, "Points");
        let raw = RawDirs {
            dtm_bare_earth: dir(&dtm, "BareEarth"),
            dtm_canopy: dir(&dtm, "Canopy"),
            points_bare_earth: dir(&points, "BareEarth"),
            points_full_cloud: dir(&points, "FullCloud"),
            points_tiled_las: dir(&points, "tiled_LAS"),
            points_tiled_laz: dir(&points, "tiled_LAZ"),
            stats: dir(&raw_root, "Stats"),
            root: raw_root,
            dtm,
            points,
        };

        let final_root = dir(&p, "Final");
        let vectors = dir(&final_root, "Vectors");
        let rasters = dir(&final_root, "Rasters");
        let bare_earth = dir(&rasters, "BareEarth");
        let canopy = dir(&rasters, "Canopy");
        let intensity = dir(&rasters, "Intensity");
        let mut final_ = FinalDirs {
            vectors_tao: dir(&vectors, "TAOs"),
            vectors_gdb: dir(&vectors, "working.gdb"),
            rasters_bare_earth_working: dir(&bare_earth, "working"),
            rasters_canopy_working: dir(&canopy, "working"),
            rasters_canopy_derivatives: dir(&canopy, "derivatives"),
            rasters_intensity_working: dir(&intensity, "working"),
            rasters_stats: dir(&rasters, "Stats"),
            rasters_qaqc: dir(&rasters, "catalogQAQC"),
            root: final_root,
            vectors,
            rasters,
            rasters_bare_earth: bare_earth,
            rasters_canopy: canopy,
            rasters_intensity: intensity,
        };

        // Prefer a local copy of the working rasters when one is mounted.
        let network_working = (
            final_.rasters_bare_earth_working.clone(),
            final_.rasters_canopy_working.clone(),
        );
        let (local_path, _) = self.project_path(project, &conv.local_drive)?;
        let use_local = drive != conv.local_drive && mounts.is_present(&local_path);
        if use_local {
            log::info!("Using local working rasters under {}", local_path);
            final_.rasters_bare_earth_working = final_
                .rasters_bare_earth_working
                .replacen(&project_path, &local_path, 1);
            final_.rasters_canopy_working = final_
                .rasters_canopy_working
                .replacen(&project_path, &local_path, 1);
        }

        let lists = ListFiles {
            las: format!("{}{}_{}.txt", raw.points, subset, file_type),
            bare_earth_dtm: format!("{}{}_BE_list.txt", raw.dtm, subset),
            tiled_las: format!("{}{}_{}_tiled.txt", raw.points, subset, file_type),
        };

        let mut index = format!("{}{}{}_index", conv.master_index_gdb, sep, project);
        let mut index_retiled = format!("{}{}_retiled", final_.vectors_gdb, project);
        if subset != ALL_TILES {
            index = format!("{}_{}", index, subset);
            index_retiled = format!("{}_{}", index_retiled, subset);
        }
        let boundary = format!("{}{}{}_bnd", conv.master_index_gdb, sep, project);
        let feature_classes = FeatureClasses {
            index,
            index_retiled,
            projection: boundary.clone(),
            boundary,
        };

        let projection = if catalog.exists(&feature_classes.projection) {
            let sr = catalog.describe(&feature_classes.projection)?;
            let utm_zone = if sr.is_transverse_mercator() {
                conv.utm_zone(sr.central_meridian)?.to_string()
            } else {
                "0".to_string()
            };
            Some(ProjectionInfo {
                utm_zone,
                wkt: sr.wkt,
            })
        } else {
            log::warn!(
                "{} not found. Projection info not set.",
                feature_classes.projection
            );
            None
        };

        Ok(LibraryPaths {
            name: project.to_string(),
            drive,
            file_type,
            subset,
            tile_buffer,
            project_path,
            projection_code: location.projection_code.clone(),
            use_local,
            raw,
            final_,
            lists,
            feature_classes,
            projection,
            network_working,
        })
    }
}

impl LibraryPaths {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn drive(&self) -> &str {
        &self.drive
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn subset(&self) -> &str {
        &self.subset
    }

    pub fn tile_buffer(&self) -> u32 {
        self.tile_buffer
    }

    /// Project root, without a trailing separator.
    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    pub fn projection_code(&self) -> &str {
        &self.projection_code
    }

    pub fn raw(&self) -> &RawDirs {
        &self.raw
    }

    pub fn final_dirs(&self) -> &FinalDirs {
        &self.final_
    }

    pub fn lists(&self) -> &ListFiles {
        &self.lists
    }

    pub fn feature_classes(&self) -> &FeatureClasses {
        &self.feature_classes
    }

    /// Projection of the boundary feature class, `None` if it could not be found.
    pub fn projection(&self) -> Option<&ProjectionInfo> {
        self.projection.as_ref()
    }

    pub fn utm_zone(&self) -> Option<&str> {
        self.projection.as_ref().map(|p| p.utm_zone.as_str())
    }

    /// Whether the working raster directories point at the local drive.
    pub fn uses_local(&self) -> bool {
        self.use_local
    }

    /// Point the working raster directories back at the network drive.
    pub fn undo_local_setting(&mut self) {
        if self.use_local {
            self.final_.rasters_bare_earth_working = self.network_working.0.clone();
            self.final_.rasters_canopy_working = self.network_working.1.clone();
            self.use_local = false;
        }
    }

    /// Bare earth DTM of a tile.
    pub fn bare_earth_dtm(&self, tile_id: &str) -> String {
        format!("{}be__{}__1.dtm", self.raw.dtm_bare_earth, tile_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{MemoryCatalog, SpatialReference, ALBERS_WKT, UTM_10N_WKT};

    fn library() -> Library {
        let lookup = LocationLookup::parse(
            Path::new("lookup.txt"),
            "project: forest, projection\nproj1: ForestA, 4326\nproj2: ForestB, 26910\n",
        )
        .unwrap();
        Library::new(Conventions::default(), lookup)
    }

    fn nothing_mounted(_: &str) -> bool {
        false
    }

    fn utm_catalog(meridian: f64) -> MemoryCatalog {
        let mut sr = SpatialReference::from_wkt(UTM_10N_WKT).unwrap();
        sr.central_meridian = meridian;
        let mut catalog = MemoryCatalog::new();
        catalog.insert(r"N:\lidar\a_indices\LiDAR_indeces3.gdb\proj1_bnd", sr);
        catalog
    }

    #[test]
    fn test_project_path() {
        let lib = library();
        let (path, location) = lib.project_path("proj1", "N").unwrap();
        assert_eq!(path, r"N:\LiDAR\ForestA\proj1");
        assert_eq!(location.projection_code, "4326");
    }

    #[test]
    fn test_default_layout() {
        let lib = library();
        let paths = lib
            .resolve(
                "proj1",
                &ProjectOptions::default(),
                &MemoryCatalog::new(),
                &nothing_mounted,
            )
            .unwrap();

        assert_eq!(paths.drive(), "N");
        assert_eq!(paths.file_type(), FileType::Laz);
        assert_eq!(paths.subset(), "all");
        assert_eq!(paths.tile_buffer(), 31);
        assert_eq!(paths.projection_code(), "4326");
        assert_eq!(paths.project_path(), r"N:\LiDAR\ForestA\proj1");

        let raw = paths.raw();
        assert_eq!(raw.root, r"N:\LiDAR\ForestA\proj1\Raw\");
        assert_eq!(raw.dtm_bare_earth, r"N:\LiDAR\ForestA\proj1\Raw\DTM\BareEarth\");
        assert_eq!(raw.dtm_canopy, r"N:\LiDAR\ForestA\proj1\Raw\DTM\Canopy\");
        assert_eq!(
            raw.points_full_cloud,
            r"N:\LiDAR\ForestA\proj1\Raw\Points\FullCloud\"
        );
        assert_eq!(
            raw.points_tiled_laz,
            r"N:\LiDAR\ForestA\proj1\Raw\Points\tiled_LAZ\"
        );
        assert_eq!(raw.stats, r"N:\LiDAR\ForestA\proj1\Raw\Stats\");

        let fin = paths.final_dirs();
        assert_eq!(
            fin.vectors_gdb,
            r"N:\LiDAR\ForestA\proj1\Final\Vectors\working.gdb\"
        );
        assert_eq!(fin.vectors_tao, r"N:\LiDAR\ForestA\proj1\Final\Vectors\TAOs\");
        assert_eq!(
            fin.rasters_bare_earth_working,
            r"N:\LiDAR\ForestA\proj1\Final\Rasters\BareEarth\working\"
        );
        assert_eq!(
            fin.rasters_canopy_derivatives,
            r"N:\LiDAR\ForestA\proj1\Final\Rasters\Canopy\derivatives\"
        );
        assert_eq!(
            fin.rasters_qaqc,
            r"N:\LiDAR\ForestA\proj1\Final\Rasters\catalogQAQC\"
        );

        let lists = paths.lists();
        assert_eq!(lists.las, r"N:\LiDAR\ForestA\proj1\Raw\Points\all_laz.txt");
        assert_eq!(
            lists.bare_earth_dtm,
            r"N:\LiDAR\ForestA\proj1\Raw\DTM\all_BE_list.txt"
        );
        assert_eq!(
            lists.tiled_las,
            r"N:\LiDAR\ForestA\proj1\Raw\Points\all_laz_tiled.txt"
        );

        let fcs = paths.feature_classes();
        assert_eq!(
            fcs.index,
            r"N:\lidar\a_indices\LiDAR_indeces3.gdb\proj1_index"
        );
        assert_eq!(
            fcs.index_retiled,
            r"N:\LiDAR\ForestA\proj1\Final\Vectors\working.gdb\proj1_retiled"
        );
        assert_eq!(fcs.boundary, r"N:\lidar\a_indices\LiDAR_indeces3.gdb\proj1_bnd");
        assert_eq!(fcs.projection, fcs.boundary);

        assert!(paths.projection().is_none());
        assert!(!paths.uses_local());
    }

    #[test]
    fn test_deterministic() {
        let lib = library();
        let options = ProjectOptions {
            drive: Some("X".to_string()),
            file_type: Some(FileType::Las),
            subset: Some("north".to_string()),
            tile_buffer: None,
        };
        let catalog = utm_catalog(-123.0);
        let a = lib.resolve("proj1", &options, &catalog, &nothing_mounted).unwrap();
        let b = lib.resolve("proj1", &options, &catalog, &nothing_mounted).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_subset_suffix() {
        let lib = library();
        let options = ProjectOptions {
            subset: Some("north".to_string()),
            file_type: Some(FileType::Las),
            ..ProjectOptions::default()
        };
        let all = lib
            .resolve("proj1", &ProjectOptions::default(), &MemoryCatalog::new(), &nothing_mounted)
            .unwrap();
        let paths = lib
            .resolve("proj1", &options, &MemoryCatalog::new(), &nothing_mounted)
            .unwrap();
        assert_eq!(
            paths.feature_classes().index,
            format!("{}_north", all.feature_classes().index)
        );
        assert_eq!(
            paths.feature_classes().index_retiled,
            format!("{}_north", all.feature_classes().index_retiled)
        );
        assert_eq!(paths.feature_classes().boundary, all.feature_classes().boundary);
        assert_eq!(
            paths.lists().las,
            r"N:\LiDAR\ForestA\proj1\Raw\Points\north_las.txt"
        );
    }

    #[test]
    fn test_empty_subset_is_all() {
        let lib = library();
        let options = ProjectOptions {
            subset: Some(String::new()),
            ..ProjectOptions::default()
        };
        let paths = lib
            .resolve("proj1", &options, &MemoryCatalog::new(), &nothing_mounted)
            .unwrap();
        assert_eq!(paths.subset(), "all");
    }

    #[test]
    fn test_unknown_project() {
        let lib = library();
        let err = lib
            .resolve("proj9", &ProjectOptions::default(), &MemoryCatalog::new(), &nothing_mounted)
            .unwrap_err();
        match err {
            Error::ProjectNotFound { project, lookup } => {
                assert_eq!(project, "proj9");
                assert_eq!(lookup, Path::new("lookup.txt"));
            }
            other => panic!("expected project not found, got {:?}", other),
        }
    }

    #[test]
    fn test_file_type() {
        assert_eq!("las".parse::<FileType>().unwrap(), FileType::Las);
        assert_eq!("laz".parse::<FileType>().unwrap(), FileType::Laz);
        let err = "LAS".parse::<FileType>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid LiDAR file type: LAS, must be in: [las, laz]"
        );
    }

    #[test]
    fn test_bad_default_file_type() {
        let mut conv = Conventions::default();
        conv.default_file_type = "xyz".to_string();
        let lib = Library::new(conv, library().lookup().clone());
        match lib.resolve("proj1", &ProjectOptions::default(), &MemoryCatalog::new(), &nothing_mounted) {
            Err(Error::InvalidFileType(t)) => assert_eq!(t, "xyz"),
            other => panic!("expected invalid file type, got {:?}", other),
        }
    }

    #[test]
    fn test_local_redirect_and_undo() {
        let lib = library();
        let local = |p: &str| p == r"D:\LiDAR\ForestA\proj1";
        let mut paths = lib
            .resolve("proj1", &ProjectOptions::default(), &MemoryCatalog::new(), &local)
            .unwrap();
        assert!(paths.uses_local());
        assert_eq!(
            paths.final_dirs().rasters_bare_earth_working,
            r"D:\LiDAR\ForestA\proj1\Final\Rasters\BareEarth\working\"
        );
        assert_eq!(
            paths.final_dirs().rasters_canopy_working,
            r"D:\LiDAR\ForestA\proj1\Final\Rasters\Canopy\working\"
        );
        // only the two working directories move
        assert_eq!(
            paths.final_dirs().rasters_intensity_working,
            r"N:\LiDAR\ForestA\proj1\Final\Rasters\Intensity\working\"
        );

        paths.undo_local_setting();
        assert!(!paths.uses_local());
        assert_eq!(
            paths.final_dirs().rasters_bare_earth_working,
            r"N:\LiDAR\ForestA\proj1\Final\Rasters\BareEarth\working\"
        );
        assert_eq!(
            paths.final_dirs().rasters_canopy_working,
            r"N:\LiDAR\ForestA\proj1\Final\Rasters\Canopy\working\"
        );

        let before = paths.clone();
        paths.undo_local_setting();
        assert_eq!(paths, before);
    }

    #[test]
    fn test_no_redirect_on_local_drive() {
        let lib = library();
        let options = ProjectOptions {
            drive: Some("D".to_string()),
            ..ProjectOptions::default()
        };
        let everything = |_: &str| true;
        let paths = lib
            .resolve("proj1", &options, &MemoryCatalog::new(), &everything)
            .unwrap();
        assert!(!paths.uses_local());
        assert_eq!(
            paths.final_dirs().rasters_canopy_working,
            r"D:\LiDAR\ForestA\proj1\Final\Rasters\Canopy\working\"
        );
    }

    #[test]
    fn test_utm_projection() {
        let lib = library();
        let paths = lib
            .resolve("proj1", &ProjectOptions::default(), &utm_catalog(-123.0), &nothing_mounted)
            .unwrap();
        assert_eq!(paths.utm_zone(), Some("10"));
        assert_eq!(paths.projection().unwrap().wkt, UTM_10N_WKT);

        let paths = lib
            .resolve("proj1", &ProjectOptions::default(), &utm_catalog(-117.0), &nothing_mounted)
            .unwrap();
        assert_eq!(paths.utm_zone(), Some("11"));
    }

    #[test]
    fn test_unknown_meridian() {
        let lib = library();
        match lib.resolve("proj1", &ProjectOptions::default(), &utm_catalog(-111.0), &nothing_mounted) {
            Err(Error::UnknownCentralMeridian(m)) => assert_eq!(m, -111.0),
            other => panic!("expected unknown meridian, got {:?}", other),
        }
    }

    #[test]
    fn test_other_projection_zone_zero() {
        let lib = library();
        let mut catalog = MemoryCatalog::new();
        catalog.insert(
            r"N:\lidar\a_indices\LiDAR_indeces3.gdb\proj1_bnd",
            SpatialReference::from_wkt(ALBERS_WKT).unwrap(),
        );
        let paths = lib
            .resolve("proj1", &ProjectOptions::default(), &catalog, &nothing_mounted)
            .unwrap();
        assert_eq!(paths.utm_zone(), Some("0"));
    }

    #[test]
    fn test_bare_earth_dtm() {
        let lib = library();
        let paths = lib
            .resolve("proj2", &ProjectOptions::default(), &MemoryCatalog::new(), &nothing_mounted)
            .unwrap();
        assert_eq!(
            paths.bare_earth_dtm("0042"),
            r"N:\LiDAR\ForestB\proj2\Raw\DTM\BareEarth\be__0042__1.dtm"
        );
    }
}
