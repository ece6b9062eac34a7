use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

const HEADER: &str = "TEMPLATE_ID,SUBJECT_ID,FILE,MEDIA_ID,SIGHTING_ID,FRAME,FACE_X,FACE_Y,\
FACE_WIDTH,FACE_HEIGHT,RIGHT_EYE_X,RIGHT_EYE_Y,LEFT_EYE_X,LEFT_EYE_Y,NOSE_BASE_X,NOSE_BASE_Y,\
YAW,FOREHEAD_VISIBLE,EYES_VISIBLE,NOSE_MOUTH_VISIBLE,INDOOR,GENDER,SKIN_TONE,AGE,FACIAL_HAIR";

fn ijba_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ijba"))
}

/// `ijba` with the environment scrubbed of every variable the binary reads.
fn ijba() -> Command {
    let mut cmd = Command::new(ijba_bin());
    cmd.env_remove("IJBA_DATA_DIR")
        .env_remove("IJBA_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("run ijba")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "ijba failed (exit={}): {}",
        output.status.code().unwrap_or(-1),
        stderr(output)
    );
}

fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "ijba unexpectedly succeeded: {}",
        stdout(output)
    );
}

fn write_manifest(path: &Path, rows: &[&str]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut body = format!("{HEADER}\n");
    for row in rows {
        body.push_str(row);
        body.push_str(",,10,20,30,40,,,,,,,,,,,,,,,\n");
    }
    fs::write(path, body).unwrap();
}

/// Split 1 of the search family written under `sets` (empty for a flat tree).
///
/// train: template 1 (img/a.jpg, img/b.jpg). gallery: template 100 (img/e.jpg).
fn search_tree(sets: &str) -> TempDir {
    let dir = tempdir().unwrap();
    let split = dir.path().join(sets).join("split1");
    write_manifest(
        &split.join("train_1.csv"),
        &["1,10,img/a.jpg,1,0", "1,10,img/b.jpg,2,0"],
    );
    write_manifest(&split.join("search_gallery_1.csv"), &["100,30,img/e.jpg,5,0"]);
    write_manifest(&split.join("search_probe_1.csv"), &["200,30,img/e.jpg,5,1"]);
    dir
}

fn write_config(dir: &Path, root: &Path) -> PathBuf {
    let path = dir.join("ijba.json");
    fs::write(
        &path,
        serde_json::json!({ "annotations_directory": root }).to_string(),
    )
    .unwrap();
    path
}

// ============================================================================
// Exit codes
// ============================================================================

#[test]
fn path_lists_materialized_files() {
    let tree = search_tree("IJB-A_1N_sets");
    let output = run(ijba()
        .arg("--data-dir")
        .arg(tree.path())
        .args(["path", "-g", "world", "--directory", "/out", "--extension", ".png"]));
    assert_success(&output);
    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines, vec!["/out/img/a-0.png", "/out/img/b-0.png"]);
}

#[test]
fn path_fails_when_nothing_is_selected() {
    let tree = search_tree("IJB-A_1N_sets");
    let output = run(ijba()
        .arg("--data-dir")
        .arg(tree.path())
        .args(["path", "-g", "dev", "--purpose", "enroll", "--model", "999"]));
    assert_failure(&output);
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("query selected no files"), "{}", stderr(&output));
}

#[test]
fn checkfiles_fails_on_a_missing_original() {
    let tree = search_tree("IJB-A_1N_sets");
    let originals = tree.path().join("originals");
    fs::create_dir_all(originals.join("img")).unwrap();
    fs::write(originals.join("img/a.jpg"), b"").unwrap();

    let output = run(ijba()
        .arg("--data-dir")
        .arg(tree.path())
        .arg("--original-dir")
        .arg(&originals)
        .args(["checkfiles", "-g", "world"]));
    assert_failure(&output);
    assert_eq!(
        stdout(&output).trim(),
        originals.join("img/b.jpg").display().to_string()
    );
    assert!(stderr(&output).contains("1 of 2 original files are missing"), "{}", stderr(&output));

    fs::write(originals.join("img/b.jpg"), b"").unwrap();
    let output = run(ijba()
        .arg("--data-dir")
        .arg(tree.path())
        .arg("--original-dir")
        .arg(&originals)
        .args(["checkfiles", "-g", "world"]));
    assert_success(&output);
}

#[test]
fn query_errors_name_the_protocol() {
    let tree = search_tree("IJB-A_1N_sets");
    let output = run(ijba()
        .arg("--data-dir")
        .arg(tree.path())
        .args(["objects", "-p", "compare_split1", "-g", "world"]));
    assert_failure(&output);
    assert!(stderr(&output).contains("querying compare_split1"), "{}", stderr(&output));
}

// ============================================================================
// Configuration precedence
// ============================================================================

#[test]
fn flat_flag_overrides_the_config_file() {
    let tree = search_tree("");
    let config = write_config(tree.path(), tree.path());

    // The JSON file alone describes the NIST layout, which this tree is not.
    let nist = run(ijba().arg("--config").arg(&config).args(["objects", "-g", "world"]));
    assert_failure(&nist);

    let flat = run(ijba()
        .arg("--config")
        .arg(&config)
        .args(["--flat", "objects", "-g", "world"]));
    assert_success(&flat);
    assert!(stdout(&flat).contains("img/a.jpg-0"), "{}", stdout(&flat));
    assert!(stdout(&flat).contains("img/b.jpg-0"), "{}", stdout(&flat));
}

#[test]
fn data_dir_flag_overrides_the_config_root() {
    let tree = search_tree("IJB-A_1N_sets");
    let elsewhere = tempdir().unwrap();
    let config = write_config(tree.path(), elsewhere.path());

    let output = run(ijba()
        .arg("--config")
        .arg(&config)
        .arg("--data-dir")
        .arg(tree.path())
        .args(["clients", "-g", "world"]));
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "10");
}

#[test]
fn environment_supplies_data_dir_and_config() {
    let tree = search_tree("IJB-A_1N_sets");

    let from_dir = run(ijba()
        .env("IJBA_DATA_DIR", tree.path())
        .args(["models", "--purpose", "enroll"]));
    assert_success(&from_dir);
    assert_eq!(stdout(&from_dir).trim(), "100");

    let config = write_config(tree.path(), tree.path());
    let from_config = run(ijba()
        .env("IJBA_CONFIG", &config)
        .args(["clients", "-g", "dev"]));
    assert_success(&from_config);
    assert_eq!(stdout(&from_config).trim(), "30");

    // An explicit flag wins over the variable.
    let overridden = run(ijba()
        .env("IJBA_DATA_DIR", "/nonexistent/ijba")
        .arg("--data-dir")
        .arg(tree.path())
        .args(["clients", "-g", "world"]));
    assert_success(&overridden);
}

#[test]
fn missing_data_dir_is_an_error() {
    let output = run(ijba().arg("protocols"));
    assert_failure(&output);
    assert!(stderr(&output).contains("no data directory"), "{}", stderr(&output));
}
