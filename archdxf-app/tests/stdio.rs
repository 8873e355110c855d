use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

const ROOM_SESSION: &str = concat!(
    r#"{"name":"new_project"}"#,
    "\n",
    r#"{"name":"draw_polyline","args":{"points":[[0,0],[3,0],[3,5],[0,5]],"closed":true}}"#,
    "\n",
    r#"{"name":"add_text","args":{"text":"3x5m Room","position":[1.5,2.5],"height":0.3}}"#,
    "\n",
    r#"{"name":"save_file","args":{"filename":"room_3x5"}}"#,
    "\n",
);

#[test]
fn stdio_session_writes_dxf_into_output_dir() {
    let dir = tempfile::tempdir().expect("temp dir");

    Command::cargo_bin("archdxf")
        .expect("binary built")
        .current_dir(dir.path())
        .env_remove("ARCHDXF_CONFIG")
        .arg("--output-dir")
        .arg(dir.path().join("plans"))
        .write_stdin(ROOM_SESSION)
        .assert()
        .success()
        .stdout(predicate::str::contains("New project started. Canvas is empty."))
        .stdout(predicate::str::contains("Text '3x5m Room' added."))
        .stdout(predicate::str::contains("File saved successfully at:"))
        .stdout(predicate::str::contains(r#""success":false"#).not());

    let written = fs::read_to_string(dir.path().join("plans").join("room_3x5.dxf"))
        .expect("DXF written");
    assert!(written.contains("0\nLWPOLYLINE\n8\nARCH-WALL\n90\n4\n70\n1\n"));
    assert!(written.contains("1\n3x5m Room\n"));
    assert!(written.ends_with("0\nEOF\n"));
}

#[test]
fn failed_commands_are_reported_on_stdout() {
    let dir = tempfile::tempdir().expect("temp dir");

    Command::cargo_bin("archdxf")
        .expect("binary built")
        .current_dir(dir.path())
        .env_remove("ARCHDXF_CONFIG")
        .write_stdin("{\"name\":\"draw_circle\",\"args\":{\"center\":[0,0],\"radius\":0}}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""success":false"#))
        .stdout(predicate::str::contains("radius must be greater than 0"));
}

#[test]
fn explicit_config_is_honoured() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = dir.path().join("archdxf.toml");
    fs::write(
        &config,
        format!(
            "[output]\ndirectory = {:?}\ndefault_filename = \"from_config\"\n",
            dir.path().join("out").to_string_lossy()
        ),
    )
    .expect("write config");

    Command::cargo_bin("archdxf")
        .expect("binary built")
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .write_stdin("{\"name\":\"save_file\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("from_config.dxf"));

    assert!(dir.path().join("out").join("from_config.dxf").is_file());
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempfile::tempdir().expect("temp dir");

    Command::cargo_bin("archdxf")
        .expect("binary built")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}
