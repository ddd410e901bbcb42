//! Path conventions and FUSION command builders for the R5 LiDAR library.
//!
//! Projects in the library live under `<drive>:\LiDAR\<forest>\<project>` and follow a fixed
//! layout of raw and final products. [Library] resolves a project name into that layout using the
//! project lookup file, and [fusion::Fusion] formats invocations of the FUSION command line tools.
extern crate itertools;
extern crate log;
extern crate nom;
extern crate serde;
extern crate thiserror;

pub mod config;
pub mod fusion;
pub mod lookup;
pub mod paths;
pub mod spatial;
pub mod tiles;

pub use crate::config::*;
pub use crate::lookup::*;
pub use crate::paths::*;
pub use crate::spatial::*;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    IOError(#[from] std::io::Error),

    #[error("{}:{line}: {message}", path.display())]
    ParseError {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid LiDAR file type: {0}, must be in: [las, laz]")]
    InvalidFileType(String),

    #[error("\"{project}\" not in project lookup: {}", lookup.display())]
    ProjectNotFound { project: String, lookup: PathBuf },

    #[error("no UTM zone configured for central meridian {0}")]
    UnknownCentralMeridian(f64),

    #[error("bad configuration in {}: {message}", path.display())]
    ConfigError { path: PathBuf, message: String },

    #[error("could not serialize: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("could not read spatial reference of {feature_class}: {message}")]
    WktError {
        feature_class: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
