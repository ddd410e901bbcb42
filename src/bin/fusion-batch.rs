extern crate env_logger;
extern crate indicatif;
extern crate lidarlib;
extern crate structopt;

use indicatif::{ProgressBar, ProgressStyle};
use lidarlib::fusion::*;
use lidarlib::tiles::las_list;
use lidarlib::{Conventions, FileType, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use structopt::clap;
use structopt::StructOpt;

#[derive(Debug, Clone, Copy)]
enum BatchTool {
    GroundFilter,
    CanopyModel,
    IntensityImage,
    Catalog,
}

impl FromStr for BatchTool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "ground-filter" => Ok(BatchTool::GroundFilter),
            "canopy-model" => Ok(BatchTool::CanopyModel),
            "intensity-image" => Ok(BatchTool::IntensityImage),
            "catalog" => Ok(BatchTool::Catalog),
            _ => Err(format!("unknown batch tool: {}", s)),
        }
    }
}

#[derive(StructOpt, Debug)]
#[structopt(
    name = "fusion-batch",
    about = "Write a script running a FUSION tool on every tile of a list."
)]
struct Opt {
    /// One of ground-filter, canopy-model, intensity-image or catalog.
    #[structopt(name = "TOOL")]
    tool: BatchTool,

    /// Tile list file, or a directory of tiles.
    #[structopt(name = "LIST", parse(from_os_str))]
    list: PathBuf,

    /// Directory the tool writes its outputs to.
    #[structopt(name = "OUTDIR", parse(from_os_str))]
    out_dir: PathBuf,

    /// Script to write, one command per line.
    #[structopt(name = "SCRIPT", parse(from_os_str))]
    script: PathBuf,

    /// Only pick up tiles of this type when LIST is a directory.
    #[structopt(long = "file-type")]
    file_type: Option<FileType>,

    #[structopt(long = "cell-size")]
    cell_size: Option<f64>,

    /// UTM zone, required by canopy-model.
    #[structopt(long = "zone")]
    zone: Option<String>,

    /// Directory of bare earth DTMs named `be__<tile>__1.dtm`, used as ground by canopy-model.
    #[structopt(long = "ground-dir", parse(from_os_str))]
    ground_dir: Option<PathBuf>,

    #[structopt(long = "switches", allow_hyphen_values = true)]
    switches: Option<String>,

    #[structopt(long = "config", parse(from_os_str))]
    config: Option<PathBuf>,

    /// Show a progress bar.
    #[structopt(short = "v", long = "verbose")]
    verbose: bool,
}

fn progress_bar(length: u64, message: &str, verbose: bool) -> ProgressBar {
    if !verbose {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(length);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len} ({eta})")
            .progress_chars("#-"),
    );
    pb.set_message(message);
    pb
}

fn output(out_dir: &Path, tile: &Path, extension: &str) -> String {
    let stem = tile
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir
        .join(format!("{}{}", stem, extension))
        .display()
        .to_string()
}

fn tile_command(fusion: &Fusion, opt: &Opt, tile: &Path) -> Invocation {
    let las = tile.display().to_string();
    let sw = opt.switches.as_deref();
    match opt.tool {
        BatchTool::GroundFilter => {
            fusion.ground_filter(&las, &output(&opt.out_dir, tile, ".las"), opt.cell_size, sw)
        }
        BatchTool::CanopyModel => {
            let ground = opt.ground_dir.as_ref().map(|d| {
                let stem = tile
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                d.join(format!("be__{}__1.dtm", stem)).display().to_string()
            });
            fusion.canopy_model(
                &las,
                &output(&opt.out_dir, tile, ".dtm"),
                opt.cell_size.unwrap_or(1.0),
                opt.zone.as_deref().unwrap_or(""),
                ground.as_deref(),
                sw,
            )
        }
        BatchTool::IntensityImage => fusion.intensity_image(
            &las,
            &output(&opt.out_dir, tile, ".bmp"),
            opt.cell_size.unwrap_or(1.0),
            sw,
        ),
        BatchTool::Catalog => fusion.catalog(&las, &output(&opt.out_dir, tile, ""), sw),
    }
}

fn run(opt: Opt) -> Result<()> {
    let conventions = Conventions::load(opt.config.as_deref())?;
    let fusion = Fusion::from_conventions(&conventions);

    let accepted = match opt.file_type {
        Some(t) => vec![t],
        None => FileType::ALL.to_vec(),
    };
    let tiles = las_list(&opt.list, &accepted)?;
    if tiles.is_empty() {
        log::warn!("No tiles found in {}", opt.list.display());
    }

    let pb = progress_bar(tiles.len() as u64, "Writing commands", opt.verbose);
    let mut script = BufWriter::new(File::create(&opt.script)?);
    for tile in &tiles {
        writeln!(script, "{}", tile_command(&fusion, &opt, tile))?;
        pb.inc(1);
    }
    script.flush()?;
    pb.finish_and_clear();

    println!(
        "Wrote {} command(s) to {}",
        tiles.len(),
        opt.script.display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let opt = Opt::from_args();
    if let (BatchTool::CanopyModel, None) = (opt.tool, &opt.zone) {
        clap::Error::with_description(
            "canopy-model needs --zone",
            clap::ErrorKind::MissingRequiredArgument,
        )
        .exit();
    }
    if let Err(e) = run(opt) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
