//! Command lines for the FUSION LiDAR toolkit.
//!
//! Every builder returns an [Invocation]. Its `Display` form is the command string handed to the
//! shell: the program and every argument slot joined by single spaces. Empty slots are kept, so an
//! omitted switch list shows up as a double space, exactly as the processing scripts expect.
//!
//! See <http://forsys.cfr.washington.edu/fusion/fusionlatest.html> for the FUSION manual.
use itertools::Itertools;

use std::fmt;

/// Default window size equation coefficients for [Fusion::canopy_maxima] (metric units).
pub const DEFAULT_WSE: &str = "2.357,0.1219,0.0009,0";
/// Default minimum tree height for [Fusion::canopy_maxima].
pub const DEFAULT_MAXIMA_THRESHOLD: f64 = 5.0;

/// Format a float the way the processing scripts always have: integral values keep a trailing
/// `.0`.
pub fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

/// Metres for both axes, UTM coordinates, NAD83 and NAVD88.
fn utm_params(units: &str, zone: &str) -> String {
    format!("{} {} 1 {} 2 2", units, units, zone)
}

fn switches(s: Option<&str>) -> String {
    s.unwrap_or("").to_string()
}

/// Empty strings count as not given.
fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Bounding box for [Fusion::clip_data].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// A program together with its argument slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.program)?;
        if !self.args.is_empty() {
            write!(f, " {}", self.args.iter().join(" "))?;
        }
        Ok(())
    }
}

/// Builds command lines for a FUSION installation.
#[derive(Debug, Clone, PartialEq)]
pub struct Fusion {
    install: String,
    separator: String,
}

impl Fusion {
    pub fn new(install: &str, separator: &str) -> Self {
        Fusion {
            install: install.to_string(),
            separator: separator.to_string(),
        }
    }

    pub fn from_conventions(conv: &crate::Conventions) -> Self {
        Fusion::new(&conv.fusion_install, &conv.separator)
    }

    fn invocation(&self, exe: &str, args: Vec<String>) -> Invocation {
        Invocation {
            program: format!("{}{}{}", self.install, self.separator, exe),
            args,
        }
    }

    /// `CanopyModel [switches] surfacefile cellsize xyunits zunits coordsys zone horizdatum
    /// vertdatum datafile`
    ///
    /// Canopy surface model, or a canopy height model when `ground` is a bare earth DTM.
    pub fn canopy_model(
        &self,
        las: &str,
        dtm: &str,
        cell_size: f64,
        utm_zone: &str,
        ground: Option<&str>,
        extra_switches: Option<&str>,
    ) -> Invocation {
        let mut sw = non_empty(ground).map_or(String::new(), |g| format!("/ground:{}", g));
        if let Some(extra) = non_empty(extra_switches) {
            sw = format!("{} {}", sw, extra);
        }
        self.invocation(
            "CanopyModel",
            vec![
                sw,
                dtm.to_string(),
                format!("{} {}", format_float(cell_size), utm_params("M", utm_zone)),
                las.to_string(),
            ],
        )
    }

    /// Canopy height model. Same as [Fusion::canopy_model] with a mandatory ground model;
    /// `params` replaces the whole cell size and coordinate system block when given.
    #[allow(clippy::too_many_arguments)]
    pub fn canopy_height(
        &self,
        las: &str,
        dtm: &str,
        cell_size: f64,
        ground: &str,
        utm_zone: &str,
        extra_switches: Option<&str>,
        params: Option<&str>,
    ) -> Invocation {
        let mut sw = format!("/ground:{}", ground);
        if let Some(extra) = non_empty(extra_switches) {
            sw = format!("{} {}", sw, extra);
        }
        let params = match params {
            Some(p) => p.to_string(),
            None => format!("{} {}", format_float(cell_size), utm_params("M", utm_zone)),
        };
        self.invocation(
            "CanopyModel",
            vec![sw, dtm.to_string(), params, las.to_string()],
        )
    }

    /// `DTM2ASCII [switches] inputfile [outputfile]`
    pub fn dtm2ascii(&self, dtm: &str, asc: &str, sw: Option<&str>) -> Invocation {
        self.invocation(
            "DTM2ASCII",
            vec![switches(sw), dtm.to_string(), asc.to_string()],
        )
    }

    /// `ASCII2DTM [switches] surfacefile xyunits zunits coordsys zone horizdatum vertdatum
    /// gridfile`
    pub fn ascii2dtm(&self, asc: &str, dtm: &str, utm_zone: &str, params: Option<&str>) -> Invocation {
        let params = params.map_or_else(|| utm_params("m", utm_zone), str::to_string);
        self.invocation("ASCII2DTM", vec![dtm.to_string(), params, asc.to_string()])
    }

    /// `CanopyMaxima [switches] inputfile outputfile`
    ///
    /// `threshold` limits the search to canopy above that height, `wse` holds the coefficients of
    /// the variable window size equation
    /// `width = A + B*ht + C*ht^2 + D*ht^3`. See [DEFAULT_MAXIMA_THRESHOLD] and [DEFAULT_WSE].
    pub fn canopy_maxima(
        &self,
        dtm: &str,
        trees_csv: &str,
        threshold: f64,
        wse: &str,
        ground: Option<&str>,
    ) -> Invocation {
        let ground = non_empty(ground).map_or(String::new(), |g| format!("/ground:{}", g));
        let sw = format!(
            "{} /wse:{} /threshold:{}",
            ground,
            wse,
            format_float(threshold)
        );
        self.invocation(
            "CanopyMaxima",
            vec![sw, dtm.to_string(), trees_csv.to_string()],
        )
    }

    /// `GridMetrics [switches] groundfile heightbreak cellsize outputfile datafile`
    pub fn grid_metrics(
        &self,
        las: &str,
        ground: &str,
        height_break: f64,
        cell_size: u32,
        out_root: &str,
        sw: &str,
    ) -> Invocation {
        self.invocation(
            "GridMetrics",
            vec![
                sw.to_string(),
                ground.to_string(),
                format_float(height_break),
                cell_size.to_string(),
                out_root.to_string(),
                las.to_string(),
            ],
        )
    }

    /// `CSV2GRID [switches] inputfile column outputfile`
    pub fn csv2grid(&self, csv: &str, asc: &str, column: u32) -> Invocation {
        self.invocation(
            "CSV2GRID",
            vec![csv.to_string(), column.to_string(), asc.to_string()],
        )
    }

    /// `IntensityImage [switches] CellSize ImageFile DataFile`
    pub fn intensity_image(&self, las: &str, image: &str, cell_size: f64, sw: Option<&str>) -> Invocation {
        self.invocation(
            "IntensityImage",
            vec![
                switches(sw),
                format_float(cell_size),
                image.to_string(),
                las.to_string(),
            ],
        )
    }

    /// `Cover [switches] groundfile coverfile heightbreak cellsize xyunits zunits coordsys zone
    /// horizdatum vertdatum datafile`
    #[allow(clippy::too_many_arguments)]
    pub fn cover(
        &self,
        las: &str,
        ground: &str,
        out_dtm: &str,
        height_break: f64,
        cell_size: f64,
        utm_zone: &str,
        sw: Option<&str>,
    ) -> Invocation {
        self.invocation(
            "Cover",
            vec![
                switches(sw),
                ground.to_string(),
                out_dtm.to_string(),
                format_float(height_break),
                format!("{} {}", format_float(cell_size), utm_params("M", utm_zone)),
                las.to_string(),
            ],
        )
    }

    /// `Catalog [switches] datafile [catalogfile]`
    ///
    /// QA/QC runs usually pass `/firstdensity:900,6,8 /rawcounts /outlier`.
    pub fn catalog(&self, las: &str, base_name: &str, sw: Option<&str>) -> Invocation {
        self.invocation(
            "Catalog",
            vec![switches(sw), las.to_string(), base_name.to_string()],
        )
    }

    /// `ClipData [switches] InputSpecifier SampleFile MinX MinY MaxX MaxY`
    pub fn clip_data(&self, las: &str, out_las: &str, extent: Extent, sw: Option<&str>) -> Invocation {
        let bounds = [extent.min_x, extent.min_y, extent.max_x, extent.max_y]
            .iter()
            .map(|x| format_float(*x))
            .join(" ");
        self.invocation(
            "ClipData",
            vec![switches(sw), las.to_string(), out_las.to_string(), bounds],
        )
    }

    /// `LDA2LAS [switches] InputFile OutputFile`
    pub fn lda2las(&self, input: &str, output: &str) -> Invocation {
        self.invocation("LDA2LAS", vec![input.to_string(), output.to_string()])
    }

    /// `GridSurfaceStats [switches] inputfile outputfile samplefactor`
    pub fn grid_surface_stats(
        &self,
        dtm: &str,
        out_dtm: &str,
        sample_factor: u32,
        sw: Option<&str>,
    ) -> Invocation {
        self.invocation(
            "GridSurfaceStats",
            vec![
                switches(sw),
                dtm.to_string(),
                out_dtm.to_string(),
                sample_factor.to_string(),
            ],
        )
    }

    /// `ASCIIImport [switches] ParamFile InputFile [OutputFile]`
    pub fn ascii_import(&self, input: &str, output: &str, param_file: &str, sw: Option<&str>) -> Invocation {
        self.invocation(
            "ASCIIImport",
            vec![
                switches(sw),
                param_file.to_string(),
                input.to_string(),
                output.to_string(),
            ],
        )
    }

    /// `FirstLastReturn [switches] OutputFile DataFile`
    pub fn first_last_return(&self, las: &str, base_out: &str, sw: Option<&str>) -> Invocation {
        self.invocation(
            "FirstLastReturn",
            vec![switches(sw), base_out.to_string(), las.to_string()],
        )
    }

    /// Open a point cloud in the PDQ viewer.
    pub fn show_in_pdq(&self, las: &str) -> Invocation {
        self.invocation("PDQ", vec![las.to_string()])
    }

    /// `GridSurfaceCreate [switches] surfacefile cellsize xyunits zunits coordsys zone
    /// horizdatum vertdatum datafile`
    ///
    /// `params` replaces everything after the cell size.
    pub fn grid_surface_create(
        &self,
        input: &str,
        output: &str,
        cell_size: f64,
        utm_zone: &str,
        sw: Option<&str>,
        params: Option<&str>,
    ) -> Invocation {
        let params = match params {
            Some(p) => format!("{} {}", format_float(cell_size), p),
            None => format!("{} {}", format_float(cell_size), utm_params("m", utm_zone)),
        };
        self.invocation(
            "GridSurfaceCreate",
            vec![switches(sw), output.to_string(), params, input.to_string()],
        )
    }

    /// `GroundFilter [switches] outputfile cellsize datafile`
    ///
    /// The cell size defaults to 5 map units, also when given as zero.
    pub fn ground_filter(
        &self,
        input: &str,
        output: &str,
        cell_size: Option<f64>,
        sw: Option<&str>,
    ) -> Invocation {
        let cell_size = cell_size
            .filter(|c| *c != 0.0)
            .map_or_else(|| "5".to_string(), format_float);
        self.invocation(
            "GroundFilter",
            vec![switches(sw), output.to_string(), cell_size, input.to_string()],
        )
    }

    /// `TreeSeg [switches] CHM ht_threshold outputfile`
    pub fn tree_seg(&self, chm: &str, out_root: &str, height_threshold: f64, sw: Option<&str>) -> Invocation {
        self.invocation(
            "TreeSeg",
            vec![
                switches(sw),
                chm.to_string(),
                format_float(height_threshold),
                out_root.to_string(),
            ],
        )
    }
}

#[cfg(test)]
fn fusion() -> Fusion {
    Fusion::new(r"C:\Fusion", r"\")
}

#[test]
fn test_format_float() {
    assert_eq!(format_float(2.0), "2.0");
    assert_eq!(format_float(0.5), "0.5");
    assert_eq!(format_float(-123.0), "-123.0");
    assert_eq!(format_float(1.25), "1.25");
}

#[test]
fn test_canopy_model() {
    let cmd = fusion().canopy_model("in.las", "out.dtm", 2.0, "10", None, None);
    assert_eq!(
        cmd.to_string(),
        r"C:\Fusion\CanopyModel  out.dtm 2.0 M M 1 10 2 2 in.las"
    );
    // same arguments, same string
    assert_eq!(
        cmd,
        fusion().canopy_model("in.las", "out.dtm", 2.0, "10", None, None)
    );

    let cmd = fusion().canopy_model("in.las", "chm.dtm", 1.0, "11", Some("be.dtm"), Some("/ascii"));
    assert_eq!(
        cmd.to_string(),
        r"C:\Fusion\CanopyModel /ground:be.dtm /ascii chm.dtm 1.0 M M 1 11 2 2 in.las"
    );

    let cmd = fusion().canopy_model("in.las", "out.dtm", 2.0, "10", None, Some("/smooth:3"));
    assert_eq!(
        cmd.to_string(),
        r"C:\Fusion\CanopyModel  /smooth:3 out.dtm 2.0 M M 1 10 2 2 in.las"
    );
}

#[test]
fn test_empty_options_are_omitted() {
    let f = fusion();
    assert_eq!(
        f.canopy_model("in.las", "o.dtm", 2.0, "10", Some(""), Some(""))
            .to_string(),
        r"C:\Fusion\CanopyModel  o.dtm 2.0 M M 1 10 2 2 in.las"
    );
    assert_eq!(
        f.canopy_height("in.las", "chm.dtm", 1.5, "be.dtm", "10", Some(""), None)
            .to_string(),
        r"C:\Fusion\CanopyModel /ground:be.dtm chm.dtm 1.5 M M 1 10 2 2 in.las"
    );
    assert_eq!(
        f.canopy_maxima("chm.dtm", "trees.csv", 5.0, DEFAULT_WSE, Some(""))
            .to_string(),
        r"C:\Fusion\CanopyMaxima  /wse:2.357,0.1219,0.0009,0 /threshold:5.0 chm.dtm trees.csv"
    );
    assert_eq!(
        f.ground_filter("t.las", "g.las", Some(0.0), None).to_string(),
        r"C:\Fusion\GroundFilter  g.las 5 t.las"
    );
}

#[test]
fn test_canopy_height() {
    let f = fusion();
    assert_eq!(
        f.canopy_height("in.las", "chm.dtm", 1.5, "be.dtm", "10", None, None)
            .to_string(),
        r"C:\Fusion\CanopyModel /ground:be.dtm chm.dtm 1.5 M M 1 10 2 2 in.las"
    );
    assert_eq!(
        f.canopy_height("in.las", "chm.dtm", 1.5, "be.dtm", "10", None, Some("3 F F 0 0 0 0"))
            .to_string(),
        r"C:\Fusion\CanopyModel /ground:be.dtm chm.dtm 3 F F 0 0 0 0 in.las"
    );
}

#[test]
fn test_raster_conversion() {
    let f = fusion();
    assert_eq!(
        f.dtm2ascii("a.dtm", "a.asc", None).to_string(),
        r"C:\Fusion\DTM2ASCII  a.dtm a.asc"
    );
    assert_eq!(
        f.dtm2ascii("a.dtm", "a.asc", Some("/raster")).to_string(),
        r"C:\Fusion\DTM2ASCII /raster a.dtm a.asc"
    );
    assert_eq!(
        f.ascii2dtm("a.asc", "a.dtm", "10", None).to_string(),
        r"C:\Fusion\ASCII2DTM a.dtm m m 1 10 2 2 a.asc"
    );
    assert_eq!(
        f.ascii2dtm("a.asc", "a.dtm", "10", Some("f f 0 0 0 0")).to_string(),
        r"C:\Fusion\ASCII2DTM a.dtm f f 0 0 0 0 a.asc"
    );
    assert_eq!(
        f.csv2grid("m.csv", "m.asc", 7).to_string(),
        r"C:\Fusion\CSV2GRID m.csv 7 m.asc"
    );
}

#[test]
fn test_canopy_maxima() {
    let f = fusion();
    assert_eq!(
        f.canopy_maxima("chm.dtm", "trees.csv", DEFAULT_MAXIMA_THRESHOLD, DEFAULT_WSE, None)
            .to_string(),
        r"C:\Fusion\CanopyMaxima  /wse:2.357,0.1219,0.0009,0 /threshold:5.0 chm.dtm trees.csv"
    );
    assert_eq!(
        f.canopy_maxima("chm.dtm", "trees.csv", 2.0, "2.51503,0,0.00901,0", Some("be.dtm"))
            .to_string(),
        r"C:\Fusion\CanopyMaxima /ground:be.dtm /wse:2.51503,0,0.00901,0 /threshold:2.0 chm.dtm trees.csv"
    );
}

#[test]
fn test_metrics() {
    let f = fusion();
    assert_eq!(
        f.grid_metrics("t.las", "be.dtm", 2.0, 20, "out", "/raster:p95")
            .to_string(),
        r"C:\Fusion\GridMetrics /raster:p95 be.dtm 2.0 20 out t.las"
    );
    assert_eq!(
        f.cover("t.las", "be.dtm", "cov.dtm", 2.0, 5.0, "10", None)
            .to_string(),
        r"C:\Fusion\Cover  be.dtm cov.dtm 2.0 5.0 M M 1 10 2 2 t.las"
    );
    assert_eq!(
        f.intensity_image("t.las", "i.bmp", 1.0, None).to_string(),
        r"C:\Fusion\IntensityImage  1.0 i.bmp t.las"
    );
    assert_eq!(
        f.grid_surface_stats("a.dtm", "s.dtm", 4, None).to_string(),
        r"C:\Fusion\GridSurfaceStats  a.dtm s.dtm 4"
    );
}

#[test]
fn test_point_tools() {
    let f = fusion();
    assert_eq!(
        f.catalog("t.las", "cat", Some("/rawcounts")).to_string(),
        r"C:\Fusion\Catalog /rawcounts t.las cat"
    );
    let extent = Extent {
        min_x: 500000.0,
        min_y: 4100000.0,
        max_x: 501500.5,
        max_y: 4101500.0,
    };
    assert_eq!(
        f.clip_data("t.las", "c.las", extent, None).to_string(),
        r"C:\Fusion\ClipData  t.las c.las 500000.0 4100000.0 501500.5 4101500.0"
    );
    assert_eq!(
        f.lda2las("t.lda", "t.las").to_string(),
        r"C:\Fusion\LDA2LAS t.lda t.las"
    );
    assert_eq!(
        f.ascii_import("t.xyz", "t.las", "p.txt", None).to_string(),
        r"C:\Fusion\ASCIIImport  p.txt t.xyz t.las"
    );
    assert_eq!(
        f.first_last_return("t.las", "fl", None).to_string(),
        r"C:\Fusion\FirstLastReturn  fl t.las"
    );
    assert_eq!(f.show_in_pdq("t.las").to_string(), r"C:\Fusion\PDQ t.las");
}

#[test]
fn test_surfaces() {
    let f = fusion();
    assert_eq!(
        f.grid_surface_create("g.las", "be.dtm", 1.0, "10", None, None)
            .to_string(),
        r"C:\Fusion\GridSurfaceCreate  be.dtm 1.0 m m 1 10 2 2 g.las"
    );
    assert_eq!(
        f.grid_surface_create("g.las", "be.dtm", 1.0, "10", Some("/median:3"), Some("f f 0 0 0 0"))
            .to_string(),
        r"C:\Fusion\GridSurfaceCreate /median:3 be.dtm 1.0 f f 0 0 0 0 g.las"
    );
    assert_eq!(
        f.ground_filter("t.las", "g.las", None, None).to_string(),
        r"C:\Fusion\GroundFilter  g.las 5 t.las"
    );
    assert_eq!(
        f.ground_filter("t.las", "g.las", Some(8.0), Some("/gparam:-2")).to_string(),
        r"C:\Fusion\GroundFilter /gparam:-2 g.las 8.0 t.las"
    );
    assert_eq!(
        f.tree_seg("chm.dtm", "segs", 2.0, None).to_string(),
        r"C:\Fusion\TreeSeg  chm.dtm 2.0 segs"
    );
}
