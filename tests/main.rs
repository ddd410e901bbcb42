use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::*;
use std::process::Command;
use tempfile::tempdir;

const UTM_10N_WKT: &str = r#"PROJCS["NAD_1983_UTM_Zone_10N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-123.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

fn write_lookup(dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let lookup = dir.join("LiDAR_project_lookup.txt");
    std::fs::write(
        &lookup,
        "project: forest, projection\nproj1: ForestA, 4326\nproj2: ForestB, 26910\n",
    )?;
    Ok(lookup)
}

fn stdout_toml(output: std::process::Output) -> Result<toml::Value, Box<dyn std::error::Error>> {
    Ok(toml::from_str(&String::from_utf8(output.stdout)?)?)
}

#[test]
fn paths_default_layout() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let lookup = write_lookup(dir.path())?;

    let mut cmd = Command::cargo_bin("lidarpaths")?;
    cmd.arg("proj1").arg("--lookup").arg(&lookup);
    let output = cmd.output()?;
    assert!(output.status.success());

    let paths = stdout_toml(output)?;
    assert_eq!(paths["project_path"].as_str(), Some(r"N:\LiDAR\ForestA\proj1"));
    assert_eq!(
        paths["raw"]["dtm_bare_earth"].as_str(),
        Some(r"N:\LiDAR\ForestA\proj1\Raw\DTM\BareEarth\")
    );
    assert_eq!(paths["file_type"].as_str(), Some("laz"));
    assert_eq!(paths["subset"].as_str(), Some("all"));
    assert_eq!(
        paths["lists"]["las"].as_str(),
        Some(r"N:\LiDAR\ForestA\proj1\Raw\Points\all_laz.txt")
    );
    assert!(paths.get("projection").is_none());

    Ok(())
}

#[test]
fn paths_missing_boundary_warns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let lookup = write_lookup(dir.path())?;

    let mut cmd = Command::cargo_bin("lidarpaths")?;
    cmd.arg("proj2").arg("--lookup").arg(&lookup);
    cmd.env("RUST_LOG", "warn");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("proj2_bnd not found"));

    Ok(())
}

#[test]
fn paths_subset_and_tile() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let lookup = write_lookup(dir.path())?;

    let mut cmd = Command::cargo_bin("lidarpaths")?;
    cmd.arg("proj1")
        .arg("--lookup")
        .arg(&lookup)
        .arg("--drive")
        .arg("X")
        .arg("--file-type")
        .arg("las")
        .arg("--subset")
        .arg("north")
        .arg("--be-tile")
        .arg("0042");
    let output = cmd.output()?;
    assert!(output.status.success());

    let paths = stdout_toml(output)?;
    assert_eq!(
        paths["feature_classes"]["index"].as_str(),
        Some(r"N:\lidar\a_indices\LiDAR_indeces3.gdb\proj1_index_north")
    );
    assert_eq!(
        paths["feature_classes"]["index_retiled"].as_str(),
        Some(r"X:\LiDAR\ForestA\proj1\Final\Vectors\working.gdb\proj1_retiled_north")
    );
    assert_eq!(
        paths["lists"]["tiled_las"].as_str(),
        Some(r"X:\LiDAR\ForestA\proj1\Raw\Points\north_las_tiled.txt")
    );
    assert_eq!(
        paths["tile"]["bare_earth_dtm"].as_str(),
        Some(r"X:\LiDAR\ForestA\proj1\Raw\DTM\BareEarth\be__0042__1.dtm")
    );

    Ok(())
}

#[test]
fn paths_unknown_project() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let lookup = write_lookup(dir.path())?;

    let mut cmd = Command::cargo_bin("lidarpaths")?;
    cmd.arg("proj9").arg("--lookup").arg(&lookup);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("\"proj9\" not in project lookup"));

    Ok(())
}

#[test]
fn paths_invalid_file_type() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let lookup = write_lookup(dir.path())?;

    let mut cmd = Command::cargo_bin("lidarpaths")?;
    cmd.arg("proj1")
        .arg("--lookup")
        .arg(&lookup)
        .arg("--file-type")
        .arg("txt");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid LiDAR file type: txt"));

    Ok(())
}

#[test]
fn paths_projection_from_prj() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let lookup = write_lookup(dir.path())?;
    let gdb = dir.path().join("indices");
    std::fs::create_dir(&gdb)?;
    std::fs::write(gdb.join("proj1_bnd.prj"), UTM_10N_WKT)?;

    let config = dir.path().join("conventions.toml");
    std::fs::write(
        &config,
        format!(
            "separator = '/'\nbase_dir = ':/LiDAR'\nmaster_index_gdb = '{}'\n",
            gdb.display()
        ),
    )?;

    let mut cmd = Command::cargo_bin("lidarpaths")?;
    cmd.arg("proj1")
        .arg("--lookup")
        .arg(&lookup)
        .arg("--config")
        .arg(&config);
    let output = cmd.output()?;
    assert!(output.status.success());

    let paths = stdout_toml(output)?;
    assert_eq!(paths["project_path"].as_str(), Some("N:/LiDAR/ForestA/proj1"));
    assert_eq!(paths["projection"]["utm_zone"].as_str(), Some("10"));
    assert_eq!(paths["projection"]["wkt"].as_str(), Some(UTM_10N_WKT));

    Ok(())
}

#[test]
fn fusion_canopy_model() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("fusion")?;
    cmd.arg("canopy-model")
        .arg("in.las")
        .arg("out.dtm")
        .arg("--cell-size")
        .arg("2.0")
        .arg("--zone")
        .arg("10");
    cmd.assert()
        .success()
        .stdout("C:\\Fusion\\CanopyModel  out.dtm 2.0 M M 1 10 2 2 in.las\n");

    Ok(())
}

#[test]
fn fusion_install_from_config() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("conventions.toml");
    std::fs::write(&config, "fusion_install = '/opt/fusion'\nseparator = '/'\n")?;

    let mut cmd = Command::cargo_bin("fusion")?;
    cmd.arg("--config")
        .arg(&config)
        .arg("canopy-maxima")
        .arg("chm.dtm")
        .arg("trees.csv");
    cmd.assert().success().stdout(
        "/opt/fusion/CanopyMaxima  /wse:2.357,0.1219,0.0009,0 /threshold:5.0 chm.dtm trees.csv\n",
    );

    Ok(())
}

#[test]
fn fusion_clip_data() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("fusion")?;
    cmd.arg("clip-data")
        .arg("t.las")
        .arg("c.las")
        .arg("--extent")
        .arg("500000,4100000,501500,4101500");
    cmd.assert().success().stdout(predicate::str::ends_with(
        "ClipData  t.las c.las 500000.0 4100000.0 501500.0 4101500.0\n",
    ));

    Ok(())
}

#[test]
fn batch_ground_filter() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let tiles = dir.path().join("tiles");
    std::fs::create_dir(&tiles)?;
    for name in &["t1.laz", "t2.laz", "t3.las", "notes.txt"] {
        std::fs::write(tiles.join(name), "")?;
    }
    let script = dir.path().join("run.bat");

    let mut cmd = Command::cargo_bin("fusion-batch")?;
    cmd.arg("ground-filter")
        .arg(&tiles)
        .arg(dir.path().join("ground"))
        .arg(&script)
        .arg("--file-type")
        .arg("laz");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 command(s)"));

    let contents = std::fs::read_to_string(&script)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("C:\\Fusion\\GroundFilter  "));
    assert!(lines[0].contains(" 5 "));
    assert!(lines[0].ends_with("t1.laz"));

    Ok(())
}

#[test]
fn batch_canopy_model_needs_zone() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let list = dir.path().join("all_laz.txt");
    std::fs::write(&list, "t1.laz\n")?;

    let mut cmd = Command::cargo_bin("fusion-batch")?;
    cmd.arg("canopy-model")
        .arg(&list)
        .arg(dir.path())
        .arg(dir.path().join("run.bat"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--zone"));

    Ok(())
}

#[test]
fn fusion_canopy_model_empty_ground() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("fusion")?;
    cmd.arg("canopy-model")
        .arg("in.las")
        .arg("o.dtm")
        .arg("--cell-size")
        .arg("2")
        .arg("--zone")
        .arg("10")
        .arg("--ground")
        .arg("");
    cmd.assert()
        .success()
        .stdout("C:\\Fusion\\CanopyModel  o.dtm 2.0 M M 1 10 2 2 in.las\n");

    Ok(())
}

#[test]
fn paths_malformed_line_only_fails_its_project() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let lookup = dir.path().join("LiDAR_project_lookup.txt");
    std::fs::write(
        &lookup,
        "project: forest, projection\nproj1: ForestA, 4326\nproj2: ForestB, 26910, extra\n",
    )?;

    let mut cmd = Command::cargo_bin("lidarpaths")?;
    cmd.arg("proj1").arg("--lookup").arg(&lookup);
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("lidarpaths")?;
    cmd.arg("proj2").arg("--lookup").arg(&lookup);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("found 3 value(s)"));

    Ok(())
}
