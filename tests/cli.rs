use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn build_assets() -> TempDir {
    // A tall foliage triangle plus a small sphere-named ornament.
    let tree = "\
o Tree
v 0 0 0
v 3 0 0
v 0 4 0
f 1 2 3
o Sphere.001
v 0 1 0
v 0.1 1 0
v 0 1.1 0
f 4 5 6
";
    let greeting = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
";
    let dir = TempDir::new().expect("temp asset dir");
    fs::write(dir.path().join("tree.obj"), tree).expect("write tree");
    fs::write(dir.path().join("greeting_0.obj"), greeting).expect("write greeting");
    dir
}

#[test]
fn summary_mode_classifies_and_simulates() {
    let assets = build_assets();
    let mut cmd = Command::cargo_bin("tinsel").expect("binary exists");
    cmd.arg(assets.path()).arg("--summary-only").arg("--seed").arg("7");
    cmd.assert()
        .success()
        .stdout(contains("Loaded tree with 2 parts (1 foliage, 1 ornaments)"))
        .stdout(contains(" - Tree (foliage)"))
        .stdout(contains(" - Sphere.001 (ornament)"))
        .stdout(contains("Loaded 1 greeting meshes for 5 lines"))
        .stdout(contains("Placed 5 gifts"))
        .stdout(contains("6000 snowflakes airborne"));
}

#[test]
fn summary_mode_tolerates_an_empty_asset_dir() {
    let assets = TempDir::new().expect("temp asset dir");
    let mut cmd = Command::cargo_bin("tinsel").expect("binary exists");
    cmd.arg(assets.path()).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Tree unavailable"))
        .stdout(contains("Loaded 0 greeting meshes for 5 lines"));
}

#[test]
fn missing_arguments_print_usage() {
    let mut cmd = Command::cargo_bin("tinsel").expect("binary exists");
    cmd.assert()
        .failure()
        .stderr(contains("Usage: tinsel <assets-dir>"));
}
