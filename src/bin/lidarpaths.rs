extern crate env_logger;
extern crate lidarlib;
extern crate structopt;

use lidarlib::*;
use serde::Serialize;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "lidarpaths",
    about = "Print the library paths and naming conventions of a LiDAR project."
)]
struct Opt {
    /// Project name as listed in the project lookup file.
    #[structopt(name = "PROJECT")]
    project: String,

    /// Drive letter of the library. Defaults to the configured default drive.
    #[structopt(long = "drive")]
    drive: Option<String>,

    /// Point cloud file type, las or laz.
    #[structopt(long = "file-type")]
    file_type: Option<FileType>,

    /// Subset of tiles. Feature class and list names get a `_<subset>` suffix.
    #[structopt(long = "subset")]
    subset: Option<String>,

    /// Tile buffer width in map units.
    #[structopt(long = "buffer")]
    tile_buffer: Option<u32>,

    /// TOML file overriding the library conventions.
    #[structopt(long = "config", parse(from_os_str))]
    config: Option<PathBuf>,

    /// Project lookup file. Defaults to the configured lookup file.
    #[structopt(long = "lookup", parse(from_os_str))]
    lookup: Option<PathBuf>,

    /// Also print the bare earth DTM of this tile.
    #[structopt(long = "be-tile")]
    be_tile: Option<String>,

    /// Keep working rasters on the library drive even if a local copy exists.
    #[structopt(long = "no-local")]
    no_local: bool,
}

#[derive(Serialize)]
struct Tile {
    bare_earth_dtm: String,
}

fn run(opt: Opt) -> Result<()> {
    let conventions = Conventions::load(opt.config.as_deref())?;
    let lookup_path = opt
        .lookup
        .clone()
        .unwrap_or_else(|| PathBuf::from(&conventions.lookup_file));
    let lookup = LocationLookup::from_file(&lookup_path)?;
    let library = Library::new(conventions, lookup);

    let options = ProjectOptions {
        drive: opt.drive,
        file_type: opt.file_type,
        subset: opt.subset,
        tile_buffer: opt.tile_buffer,
    };
    let mut paths = library.resolve(&opt.project, &options, &PrjCatalog, &LocalMounts)?;
    if opt.no_local {
        paths.undo_local_setting();
    }

    print!("{}", toml::to_string(&paths)?);
    if let Some(tile) = opt.be_tile {
        let tile = Tile {
            bare_earth_dtm: paths.bare_earth_dtm(&tile),
        };
        print!("\n[tile]\n{}", toml::to_string(&tile)?);
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let opt = Opt::from_args();
    if let Err(e) = run(opt) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
