//! End-to-end tests of the `rigscan` binary for commands that never touch
//! the rig.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn rigscan(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rigscan"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Write a config pointing session storage at `base` and return its path.
fn write_config(dir: &Path, base: &Path) -> String {
    let path = dir.join("rigscan.toml");
    fs::write(
        &path,
        format!("[storage]\nbase_dir = {:?}\n", base.display().to_string()),
    )
    .unwrap();
    path.display().to_string()
}

const GRID: [&str; 12] = [
    "--h-start", "0", "--h-end", "90", "--h-steps", "3", "--v-start", "0", "--v-end", "90",
    "--v-steps", "2",
];

#[test]
fn gen_config_prints_every_section() {
    let output = rigscan(&["gen-config"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for section in ["[storage]", "[serial]", "[home]", "[timing]", "[camera]"] {
        assert!(text.contains(section), "missing {section}");
    }
}

#[test]
fn plan_lists_next_session_files_without_creating_it() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("drive");
    fs::create_dir_all(base.join("Image_set_2")).unwrap();
    let config = write_config(tmp.path(), &base);

    let mut args = vec!["--config", config.as_str(), "plan"];
    args.extend(GRID);
    let output = rigscan(&args);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let text = stdout(&output);
    assert!(text.contains("    Horizontal: 0, 30, 60"));
    assert!(text.contains("Image_3_1_r_0_c_0.jpg"));
    assert!(text.contains("Image_3_6_r_60_c_45.jpg"));
    assert!(text.contains("6 nodes, 6 frames"));
    assert!(!base.join("Image_set_3").exists());
}

#[test]
fn plan_reads_json_request_file() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("drive");
    fs::create_dir(&base).unwrap();
    let config = write_config(tmp.path(), &base);
    let request = tmp.path().join("request.json");
    fs::write(
        &request,
        r#"{"horizontalStart": "0", "horizontalEnd": 90, "horizontalStep": 3,
            "verticalStart": 0, "verticalEnd": 90, "verticalStep": "2",
            "stereoMode": true}"#,
    )
    .unwrap();

    let output = rigscan(&[
        "--config",
        config.as_str(),
        "plan",
        "--request",
        request.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Image_0_1S_r_180_c_0.jpg"));
    assert!(text.contains("6 nodes, 12 frames"));
}

#[test]
fn zero_steps_rejected_before_anything_happens() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("drive");
    fs::create_dir(&base).unwrap();
    let config = write_config(tmp.path(), &base);

    let output = rigscan(&[
        "--config", config.as_str(), "scan", "--h-start", "0", "--h-end", "90", "--h-steps", "3",
        "--v-start", "0", "--v-end", "90", "--v-steps", "0",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("vertical"), "stderr: {stderr}");
    assert_eq!(fs::read_dir(&base).unwrap().count(), 0);
}

#[test]
fn unknown_config_key_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("rigscan.toml");
    fs::write(&config, "[storage]\nbase_dirr = \"/tmp\"\n").unwrap();

    let mut args = vec!["--config", config.to_str().unwrap(), "plan"];
    args.extend(GRID);
    let output = rigscan(&args);
    assert!(!output.status.success());
}

#[test]
fn absurd_step_count_rejected_before_anything_happens() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("drive");
    fs::create_dir(&base).unwrap();
    let config = write_config(tmp.path(), &base);

    let output = rigscan(&[
        "--config", config.as_str(), "scan", "--h-start", "0", "--h-end", "90", "--h-steps",
        "9223372036854775807", "--v-start", "0", "--v-end", "90", "--v-steps", "2",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exceeds the limit"), "stderr: {stderr}");
    assert_eq!(fs::read_dir(&base).unwrap().count(), 0);
}
