//! Spatial reference lookup for feature classes.
//!
//! Path resolution only needs two things from the GIS side: whether a project's boundary feature
//! class exists, and the spatial reference it is stored in. [SpatialCatalog] abstracts that so a
//! geodatabase backend can be swapped for `.prj` files ([PrjCatalog]) or a fixed table
//! ([MemoryCatalog]).
use nom::branch::alt;
use nom::bytes::complete::{take_till, take_while1};
use nom::character::complete::{char, multispace0, one_of};
use nom::combinator::map;
use nom::error::VerboseError;
use nom::multi::separated_list;
use nom::number::complete::double;
use nom::sequence::{delimited, preceded};
use nom::IResult;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::{Error, Result};

/// Projection classification of a UTM coordinate system.
pub const TRANSVERSE_MERCATOR: &str = "Transverse_Mercator";

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialReference {
    /// Projection classification, empty for geographic coordinate systems.
    pub projection_name: String,
    pub central_meridian: f64,
    /// Serialized well-known-text form.
    pub wkt: String,
}

pub trait SpatialCatalog {
    fn exists(&self, feature_class: &str) -> bool;
    fn describe(&self, feature_class: &str) -> Result<SpatialReference>;
}

/// Feature classes backed by ESRI `.prj` files: feature class `X` is described by `X.prj`.
#[derive(Debug, Clone, Default)]
pub struct PrjCatalog;

impl PrjCatalog {
    fn prj_path(feature_class: &str) -> PathBuf {
        PathBuf::from(format!("{}.prj", feature_class))
    }
}

impl SpatialCatalog for PrjCatalog {
    fn exists(&self, feature_class: &str) -> bool {
        PrjCatalog::prj_path(feature_class).is_file()
    }

    fn describe(&self, feature_class: &str) -> Result<SpatialReference> {
        let wkt = std::fs::read_to_string(PrjCatalog::prj_path(feature_class))?;
        SpatialReference::from_wkt(&wkt).map_err(|message| Error::WktError {
            feature_class: feature_class.to_string(),
            message,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    references: HashMap<String, SpatialReference>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        MemoryCatalog::default()
    }

    pub fn insert(&mut self, feature_class: &str, sr: SpatialReference) {
        self.references.insert(feature_class.to_string(), sr);
    }
}

impl SpatialCatalog for MemoryCatalog {
    fn exists(&self, feature_class: &str) -> bool {
        self.references.contains_key(feature_class)
    }

    fn describe(&self, feature_class: &str) -> Result<SpatialReference> {
        self.references
            .get(feature_class)
            .cloned()
            .ok_or_else(|| Error::WktError {
                feature_class: feature_class.to_string(),
                message: "feature class does not exist".to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum WktValue {
    Text(String),
    Number(f64),
    Node(WktNode),
}

#[derive(Debug, Clone, PartialEq)]
struct WktNode {
    keyword: String,
    values: Vec<WktValue>,
}

impl WktNode {
    /// Depth first search for nodes with the given keyword.
    fn find_all<'a>(&'a self, keyword: &str, out: &mut Vec<&'a WktNode>) {
        if self.keyword.eq_ignore_ascii_case(keyword) {
            out.push(self);
        }
        for v in &self.values {
            if let WktValue::Node(n) = v {
                n.find_all(keyword, out);
            }
        }
    }

    fn text(&self, i: usize) -> Option<&str> {
        match self.values.get(i) {
            Some(WktValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn number(&self, i: usize) -> Option<f64> {
        match self.values.get(i) {
            Some(WktValue::Number(x)) => Some(*x),
            _ => None,
        }
    }
}

fn keyword(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    preceded(
        multispace0,
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    )(input)
}

fn quoted(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    preceded(
        multispace0,
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
    )(input)
}

fn value(input: &str) -> IResult<&str, WktValue, VerboseError<&str>> {
    alt((
        map(quoted, |s| WktValue::Text(s.to_string())),
        map(preceded(multispace0, double), WktValue::Number),
        map(node, WktValue::Node),
    ))(input)
}

fn node(input: &str) -> IResult<&str, WktNode, VerboseError<&str>> {
    let (input, kw) = keyword(input)?;
    let (input, _) = preceded(multispace0, one_of("[("))(input)?;
    let (input, values) = separated_list(preceded(multispace0, char(',')), value)(input)?;
    let (input, _) = preceded(multispace0, one_of("])"))(input)?;
    Ok((
        input,
        WktNode {
            keyword: kw.to_string(),
            values,
        },
    ))
}

impl SpatialReference {
    /// Read projection name and central meridian from ESRI well-known text.
    pub fn from_wkt(wkt: &str) -> std::result::Result<Self, String> {
        let wkt = wkt.trim();
        let root = match node(wkt) {
            Ok((_, root)) => root,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(nom::error::convert_error(wkt, e))
            }
            Err(nom::Err::Incomplete(x)) => return Err(format!("{:?}", x)),
        };

        let mut projections = Vec::new();
        root.find_all("PROJECTION", &mut projections);
        let projection_name = projections
            .first()
            .and_then(|p| p.text(0))
            .unwrap_or("")
            .to_string();

        let mut parameters = Vec::new();
        root.find_all("PARAMETER", &mut parameters);
        let central_meridian = parameters
            .iter()
            .find(|p| {
                p.text(0)
                    .map_or(false, |n| n.eq_ignore_ascii_case("Central_Meridian"))
            })
            .and_then(|p| p.number(1))
            .unwrap_or(0.0);

        Ok(SpatialReference {
            projection_name,
            central_meridian,
            wkt: wkt.to_string(),
        })
    }

    pub fn is_transverse_mercator(&self) -> bool {
        self.projection_name == TRANSVERSE_MERCATOR
    }
}

#[cfg(test)]
pub(crate) const UTM_10N_WKT: &str = r#"PROJCS["NAD_1983_UTM_Zone_10N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-123.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

#[cfg(test)]
pub(crate) const ALBERS_WKT: &str = r#"PROJCS["NAD_1983_California_Teale_Albers",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Albers"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",-4000000.0],PARAMETER["Central_Meridian",-120.0],PARAMETER["Standard_Parallel_1",34.0],PARAMETER["Standard_Parallel_2",40.5],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

#[test]
fn test_utm_wkt() {
    let sr = SpatialReference::from_wkt(UTM_10N_WKT).unwrap();
    assert_eq!(sr.projection_name, "Transverse_Mercator");
    assert!(sr.is_transverse_mercator());
    assert_eq!(sr.central_meridian, -123.0);
    assert_eq!(sr.wkt, UTM_10N_WKT);
}

#[test]
fn test_albers_wkt() {
    let sr = SpatialReference::from_wkt(&format!("  {}\n", ALBERS_WKT)).unwrap();
    assert_eq!(sr.projection_name, "Albers");
    assert!(!sr.is_transverse_mercator());
    assert_eq!(sr.central_meridian, -120.0);
    assert_eq!(sr.wkt, ALBERS_WKT);
}

#[test]
fn test_geographic_wkt() {
    let sr = SpatialReference::from_wkt(
        r#"GEOGCS["GCS_WGS_1984", DATUM["D_WGS_1984", SPHEROID["WGS_1984", 6378137.0, 298.257223563]], PRIMEM["Greenwich", 0.0], UNIT["Degree", 0.0174532925199433]]"#,
    )
    .unwrap();
    assert_eq!(sr.projection_name, "");
    assert_eq!(sr.central_meridian, 0.0);
}

#[test]
fn test_bad_wkt() {
    assert!(SpatialReference::from_wkt("PROJCS[\"broken\",").is_err());
    assert!(SpatialReference::from_wkt("").is_err());
}

#[test]
fn test_prj_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let fc = dir.path().join("proj1_bnd");
    let fc = fc.to_str().unwrap();
    assert!(!PrjCatalog.exists(fc));

    std::fs::write(format!("{}.prj", fc), UTM_10N_WKT).unwrap();
    assert!(PrjCatalog.exists(fc));
    assert_eq!(PrjCatalog.describe(fc).unwrap().central_meridian, -123.0);
}
