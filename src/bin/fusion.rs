extern crate env_logger;
extern crate lidarlib;
extern crate structopt;

use lidarlib::fusion::*;
use lidarlib::{Conventions, Result};
use std::path::PathBuf;
use std::str::FromStr;
use structopt::StructOpt;

// helper to parse MinX,MinY,MaxX,MaxY with structopt
fn parse_extent(s: &str) -> std::result::Result<Extent, String> {
    let v = s
        .split(',')
        .map(|x| f64::from_str(x.trim()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    if v.len() != 4 {
        return Err(format!("expected MinX,MinY,MaxX,MaxY, got {}", s));
    }
    Ok(Extent {
        min_x: v[0],
        min_y: v[1],
        max_x: v[2],
        max_y: v[3],
    })
}

#[derive(StructOpt, Debug)]
enum Tool {
    /// Canopy surface model, or canopy height model when --ground is given.
    CanopyModel {
        #[structopt(name = "LAS")]
        las: String,
        #[structopt(name = "DTM")]
        dtm: String,
        #[structopt(long = "cell-size")]
        cell_size: f64,
        #[structopt(long = "zone")]
        zone: String,
        #[structopt(long = "ground")]
        ground: Option<String>,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Canopy height model normalized by a bare earth DTM.
    CanopyHeight {
        #[structopt(name = "LAS")]
        las: String,
        #[structopt(name = "DTM")]
        dtm: String,
        #[structopt(long = "cell-size")]
        cell_size: f64,
        #[structopt(long = "ground")]
        ground: String,
        #[structopt(long = "zone")]
        zone: String,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
        /// Replaces the cell size and coordinate system parameters.
        #[structopt(long = "params")]
        params: Option<String>,
    },
    /// Convert a DTM to an ASCII raster.
    #[structopt(name = "dtm2ascii")]
    Dtm2Ascii {
        #[structopt(name = "DTM")]
        dtm: String,
        #[structopt(name = "ASC")]
        asc: String,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Convert an ASCII raster to a DTM.
    #[structopt(name = "ascii2dtm")]
    Ascii2Dtm {
        #[structopt(name = "ASC")]
        asc: String,
        #[structopt(name = "DTM")]
        dtm: String,
        #[structopt(long = "zone")]
        zone: String,
        #[structopt(long = "params")]
        params: Option<String>,
    },
    /// Find local maxima (tree tops) in a canopy height model.
    CanopyMaxima {
        #[structopt(name = "DTM")]
        dtm: String,
        #[structopt(name = "TREES")]
        trees: String,
        #[structopt(long = "threshold", default_value = "5.0")]
        threshold: f64,
        #[structopt(long = "wse", default_value = "2.357,0.1219,0.0009,0")]
        wse: String,
        #[structopt(long = "ground")]
        ground: Option<String>,
    },
    /// Raster metrics of a point cloud.
    GridMetrics {
        #[structopt(name = "LAS")]
        las: String,
        #[structopt(name = "GROUND")]
        ground: String,
        #[structopt(long = "height-break")]
        height_break: f64,
        #[structopt(long = "cell-size")]
        cell_size: u32,
        #[structopt(name = "OUT")]
        out: String,
        #[structopt(long = "switches", default_value = "", allow_hyphen_values = true)]
        switches: String,
    },
    /// Convert one column of a CSV file to an ASCII raster.
    #[structopt(name = "csv2grid")]
    Csv2Grid {
        #[structopt(name = "CSV")]
        csv: String,
        #[structopt(name = "COLUMN")]
        column: u32,
        #[structopt(name = "ASC")]
        asc: String,
    },
    /// Intensity image of a point cloud.
    IntensityImage {
        #[structopt(name = "LAS")]
        las: String,
        #[structopt(name = "IMAGE")]
        image: String,
        #[structopt(long = "cell-size")]
        cell_size: f64,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Canopy cover above a height break.
    Cover {
        #[structopt(name = "LAS")]
        las: String,
        #[structopt(name = "GROUND")]
        ground: String,
        #[structopt(name = "OUT")]
        out: String,
        #[structopt(long = "height-break")]
        height_break: f64,
        #[structopt(long = "cell-size")]
        cell_size: f64,
        #[structopt(long = "zone")]
        zone: String,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Catalog and QA/QC report of point cloud tiles.
    Catalog {
        #[structopt(name = "LAS")]
        las: String,
        #[structopt(name = "BASENAME")]
        base_name: String,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Clip a point cloud to an extent.
    ClipData {
        #[structopt(name = "LAS")]
        las: String,
        #[structopt(name = "OUT")]
        out: String,
        /// MinX,MinY,MaxX,MaxY
        #[structopt(long = "extent", parse(try_from_str = parse_extent), allow_hyphen_values = true)]
        extent: Extent,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Convert LDA to LAS.
    #[structopt(name = "lda2las")]
    Lda2Las {
        #[structopt(name = "INPUT")]
        input: String,
        #[structopt(name = "OUTPUT")]
        output: String,
    },
    /// Statistics of a surface model.
    GridSurfaceStats {
        #[structopt(name = "DTM")]
        dtm: String,
        #[structopt(name = "OUT")]
        out: String,
        #[structopt(long = "sample-factor")]
        sample_factor: u32,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Import ASCII point data.
    #[structopt(name = "ascii-import")]
    AsciiImport {
        #[structopt(name = "INPUT")]
        input: String,
        #[structopt(name = "OUTPUT")]
        output: String,
        #[structopt(long = "param-file")]
        param_file: String,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Split first and last returns.
    FirstLastReturn {
        #[structopt(name = "LAS")]
        las: String,
        #[structopt(name = "OUT")]
        out: String,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Show a point cloud in the PDQ viewer.
    #[structopt(name = "pdq")]
    Pdq {
        #[structopt(name = "LAS")]
        las: String,
    },
    /// Bare earth surface from ground points.
    GridSurfaceCreate {
        #[structopt(name = "INPUT")]
        input: String,
        #[structopt(name = "OUTPUT")]
        output: String,
        #[structopt(long = "cell-size")]
        cell_size: f64,
        #[structopt(long = "zone")]
        zone: String,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
        /// Replaces the coordinate system parameters after the cell size.
        #[structopt(long = "params")]
        params: Option<String>,
    },
    /// Filter ground points.
    GroundFilter {
        #[structopt(name = "INPUT")]
        input: String,
        #[structopt(name = "OUTPUT")]
        output: String,
        #[structopt(long = "cell-size")]
        cell_size: Option<f64>,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
    /// Segment individual trees from a canopy height model.
    TreeSeg {
        #[structopt(name = "CHM")]
        chm: String,
        #[structopt(name = "OUT")]
        out: String,
        #[structopt(long = "height-threshold")]
        height_threshold: f64,
        #[structopt(long = "switches", allow_hyphen_values = true)]
        switches: Option<String>,
    },
}

#[derive(StructOpt, Debug)]
#[structopt(name = "fusion", about = "Print the command line of a FUSION tool.")]
struct Opt {
    /// TOML file overriding the library conventions, including the FUSION install directory.
    #[structopt(long = "config", parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    tool: Tool,
}

fn invocation(fusion: &Fusion, tool: Tool) -> Invocation {
    match tool {
        Tool::CanopyModel {
            las,
            dtm,
            cell_size,
            zone,
            ground,
            switches,
        } => fusion.canopy_model(
            &las,
            &dtm,
            cell_size,
            &zone,
            ground.as_deref(),
            switches.as_deref(),
        ),
        Tool::CanopyHeight {
            las,
            dtm,
            cell_size,
            ground,
            zone,
            switches,
            params,
        } => fusion.canopy_height(
            &las,
            &dtm,
            cell_size,
            &ground,
            &zone,
            switches.as_deref(),
            params.as_deref(),
        ),
        Tool::Dtm2Ascii { dtm, asc, switches } => fusion.dtm2ascii(&dtm, &asc, switches.as_deref()),
        Tool::Ascii2Dtm {
            asc,
            dtm,
            zone,
            params,
        } => fusion.ascii2dtm(&asc, &dtm, &zone, params.as_deref()),
        Tool::CanopyMaxima {
            dtm,
            trees,
            threshold,
            wse,
            ground,
        } => fusion.canopy_maxima(&dtm, &trees, threshold, &wse, ground.as_deref()),
        Tool::GridMetrics {
            las,
            ground,
            height_break,
            cell_size,
            out,
            switches,
        } => fusion.grid_metrics(&las, &ground, height_break, cell_size, &out, &switches),
        Tool::Csv2Grid { csv, column, asc } => fusion.csv2grid(&csv, &asc, column),
        Tool::IntensityImage {
            las,
            image,
            cell_size,
            switches,
        } => fusion.intensity_image(&las, &image, cell_size, switches.as_deref()),
        Tool::Cover {
            las,
            ground,
            out,
            height_break,
            cell_size,
            zone,
            switches,
        } => fusion.cover(
            &las,
            &ground,
            &out,
            height_break,
            cell_size,
            &zone,
            switches.as_deref(),
        ),
        Tool::Catalog {
            las,
            base_name,
            switches,
        } => fusion.catalog(&las, &base_name, switches.as_deref()),
        Tool::ClipData {
            las,
            out,
            extent,
            switches,
        } => fusion.clip_data(&las, &out, extent, switches.as_deref()),
        Tool::Lda2Las { input, output } => fusion.lda2las(&input, &output),
        Tool::GridSurfaceStats {
            dtm,
            out,
            sample_factor,
            switches,
        } => fusion.grid_surface_stats(&dtm, &out, sample_factor, switches.as_deref()),
        Tool::AsciiImport {
            input,
            output,
            param_file,
            switches,
        } => fusion.ascii_import(&input, &output, &param_file, switches.as_deref()),
        Tool::FirstLastReturn { las, out, switches } => {
            fusion.first_last_return(&las, &out, switches.as_deref())
        }
        Tool::Pdq { las } => fusion.show_in_pdq(&las),
        Tool::GridSurfaceCreate {
            input,
            output,
            cell_size,
            zone,
            switches,
            params,
        } => fusion.grid_surface_create(
            &input,
            &output,
            cell_size,
            &zone,
            switches.as_deref(),
            params.as_deref(),
        ),
        Tool::GroundFilter {
            input,
            output,
            cell_size,
            switches,
        } => fusion.ground_filter(&input, &output, cell_size, switches.as_deref()),
        Tool::TreeSeg {
            chm,
            out,
            height_threshold,
            switches,
        } => fusion.tree_seg(&chm, &out, height_threshold, switches.as_deref()),
    }
}

fn run(opt: Opt) -> Result<()> {
    let conventions = Conventions::load(opt.config.as_deref())?;
    let fusion = Fusion::from_conventions(&conventions);
    println!("{}", invocation(&fusion, opt.tool));
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
