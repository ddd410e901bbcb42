//! Project lookup file.
//!
//! The first line of the file is a header. Every other line maps a project name to the forest it
//! is stored under and its projection code:
//!
//! ```text
//! project: forest, projection
//! SierraNF_2015: Sierra, 26911
//! ```
use nom::bytes::complete::take_till;
use nom::character::complete::char;
use nom::error::VerboseError;
use nom::sequence::separated_pair;
use nom::IResult;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Administrative unit (forest) the project is filed under.
    pub forest: String,
    pub projection_code: String,
}

#[derive(Debug, Clone)]
enum Entry {
    Valid(Location),
    /// Entry without exactly two values; only an error once the project is asked for.
    Malformed { line: usize, found: usize },
}

#[derive(Debug, Clone)]
pub struct LocationLookup {
    source: PathBuf,
    locations: HashMap<String, Entry>,
}

fn entry(input: &str) -> IResult<&str, (&str, &str), VerboseError<&str>> {
    separated_pair(take_till(|c: char| c == ':'), char(':'), take_till(|c: char| c == ':'))(input)
}

impl LocationLookup {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let lookup = LocationLookup::parse(path, &contents)?;
        log::debug!(
            "Loaded {} project locations from {}",
            lookup.len(),
            path.display()
        );
        Ok(lookup)
    }

    /// Parse lookup file contents. `source` is only used to name the file in errors.
    pub fn parse(source: &Path, contents: &str) -> Result<Self> {
        let mut locations = HashMap::new();
        for (i, line) in contents.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parse_error = |message: String| Error::ParseError {
                path: source.to_path_buf(),
                line: i + 1,
                message,
            };

            let (key, values) = match entry(line) {
                Ok((_, kv)) => kv,
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                    return Err(parse_error(nom::error::convert_error(line, e)))
                }
                Err(nom::Err::Incomplete(x)) => return Err(parse_error(format!("{:?}", x))),
            };
            let key = key.trim();
            let values: Vec<&str> = values.split(',').map(str::trim).collect();
            let entry = match values.as_slice() {
                [forest, projection_code] => Entry::Valid(Location {
                    forest: forest.to_string(),
                    projection_code: projection_code.to_string(),
                }),
                _ => {
                    log::warn!(
                        "{}:{}: \"{}\" has {} value(s), expected 2",
                        source.display(),
                        i + 1,
                        key,
                        values.len()
                    );
                    Entry::Malformed {
                        line: i + 1,
                        found: values.len(),
                    }
                }
            };
            locations.insert(key.to_string(), entry);
        }
        Ok(LocationLookup {
            source: source.to_path_buf(),
            locations,
        })
    }

    /// Location of `project`. A project whose line does not hold exactly two values is a
    /// [Error::ParseError] naming that line.
    pub fn get(&self, project: &str) -> Result<&Location> {
        match self.locations.get(project) {
            Some(Entry::Valid(location)) => Ok(location),
            Some(Entry::Malformed { line, found }) => Err(Error::ParseError {
                path: self.source.clone(),
                line: *line,
                message: format!(
                    "expected \"forest, projection\" after \"{}:\", found {} value(s)",
                    project, found
                ),
            }),
            None => Err(Error::ProjectNotFound {
                project: project.to_string(),
                lookup: self.source.clone(),
            }),
        }
    }

    /// File the lookup was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Project names in sorted order.
    pub fn projects(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.locations.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

#[test]
fn test_parse_lookup() {
    let text = "project: forest, projection\n\
                proj1: ForestA, 4326\n\
                \n\
                  Sierra_2015 :  Sierra ,26911  \n";
    let lookup = LocationLookup::parse(Path::new("lookup.txt"), text).unwrap();
    assert_eq!(lookup.len(), 2);
    assert_eq!(
        lookup.get("proj1").unwrap(),
        &Location {
            forest: "ForestA".to_string(),
            projection_code: "4326".to_string()
        }
    );
    assert_eq!(lookup.get("Sierra_2015").unwrap().forest, "Sierra");
    assert_eq!(lookup.projects(), vec!["Sierra_2015", "proj1"]);
}

#[test]
fn test_header_is_skipped() {
    // a header that happens to look like an entry is still ignored
    let text = "header: not, data\nproj1: ForestA, 4326\n";
    let lookup = LocationLookup::parse(Path::new("lookup.txt"), text).unwrap();
    assert!(lookup.get("header").is_err());
    assert_eq!(lookup.len(), 1);
}

#[test]
fn test_missing_separator() {
    let text = "header\nproj1: ForestA, 4326\nproj2 ForestB 26910\n";
    match LocationLookup::parse(Path::new("lookup.txt"), text) {
        Err(Error::ParseError { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_wrong_value_count() {
    let text = "header\nproj1: ForestA, 4326\nproj2: ForestB, 26910, extra\nproj3: ForestC\n";
    let lookup = LocationLookup::parse(Path::new("lookup.txt"), text).unwrap();
    assert_eq!(lookup.get("proj1").unwrap().forest, "ForestA");
    match lookup.get("proj2") {
        Err(Error::ParseError { line, message, .. }) => {
            assert_eq!(line, 3);
            assert!(message.contains("found 3 value(s)"));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
    match lookup.get("proj3") {
        Err(Error::ParseError { line, .. }) => assert_eq!(line, 4),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_text_after_second_colon() {
    let text = "header\nproj1: ForestA, 4326: trailing\n";
    let lookup = LocationLookup::parse(Path::new("lookup.txt"), text).unwrap();
    assert_eq!(
        lookup.get("proj1").unwrap(),
        &Location {
            forest: "ForestA".to_string(),
            projection_code: "4326".to_string()
        }
    );
}

#[test]
fn test_project_not_found() {
    let lookup =
        LocationLookup::parse(Path::new("lookup.txt"), "header\nproj1: ForestA, 4326\n").unwrap();
    let err = lookup.get("proj9").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("proj9"));
    assert!(msg.contains("lookup.txt"));
}

#[test]
fn test_missing_file() {
    match LocationLookup::from_file(Path::new("/nonexistent/lookup.txt")) {
        Err(Error::IOError(_)) => (),
        other => panic!("expected io error, got {:?}", other),
    }
}
