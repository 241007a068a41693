use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn query_command_prints_plan_json() {
    Command::cargo_bin("survey_gis_cli")
        .unwrap()
        .args(["query", "NW/4 S32 T7N R1E"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trs_membership"))
        .stdout(predicate::str::contains("\"tshp\": 6"))
        .stdout(predicate::str::contains("\"rng\": 0"));
}

#[test]
fn query_command_reports_parse_errors() {
    Command::cargo_bin("survey_gis_cli")
        .unwrap()
        .args(["query", "desc:\""])
        .assert()
        .success()
        .stderr(predicate::str::contains("bad search term"));
}

#[test]
fn traverse_command_prints_listing() {
    let file = assert_fs::NamedTempFile::new("linedata.txt").unwrap();
    file.write_str("BEGIN 1000 2000\n1 45.0000 100.000\n").unwrap();

    Command::cargo_bin("survey_gis_cli")
        .unwrap()
        .args(["traverse", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Begin polyline"))
        .stdout(predicate::str::contains("Line to NE"));
}

#[test]
fn traverse_command_reports_bad_lines() {
    let file = assert_fs::NamedTempFile::new("linedata.txt").unwrap();
    file.write_str("BEGIN 1000 2000\nWALK 1 2\n").unwrap();

    Command::cargo_bin("survey_gis_cli")
        .unwrap()
        .args(["traverse", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("[2] Bad line format"));
}

#[test]
fn make_grid_command_round_trips() {
    let listing = "\
 HTDP (VERSION v3.2.7    ) OUTPUT

 DISPLACEMENTS IN METERS RELATIVE TO NAD_83(2011/CORS96/2007)
 FROM 07-02-2019 TO 01-01-2010 (month-day-year)
 FROM 2019.500 TO 2010.000 (decimal years)

NAME OF SITE             LATITUDE          LONGITUDE            NORTH    EAST    UP
2019.50      0   0       38 30  0.00000 N  120  0  0.00000 W   -0.087   0.067   0.013
2019.50      0   1       38 30  0.00000 N  120  0 15.00000 W   -0.088   0.068   0.013
2019.50      1   0       38 30 15.00000 N  120  0  0.00000 W   -0.090   0.070   0.013
2019.50      1   1       38 30 15.00000 N  120  0 15.00000 W   -0.091   0.071   0.013
";
    let dir = assert_fs::TempDir::new().unwrap();
    let src = dir.child("disp.txt");
    src.write_str(listing).unwrap();
    let grid = dir.child("disp.grd");
    let dims = dir.child("disp.dim");

    Command::cargo_bin("survey_gis_cli")
        .unwrap()
        .args([
            "make-grid",
            src.path().to_str().unwrap(),
            grid.path().to_str().unwrap(),
            dims.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2x2 grid"));

    grid.assert(predicate::path::exists());
    dims.assert(predicate::str::contains("NAD_83(2011/CORS96/2007)"));
}
