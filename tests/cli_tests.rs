use std::fs;

use assert_cmd::prelude::*;
use std::process::Command;

fn write_asm(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn assemble_writes_full_image() {
    let dir = tempfile::tempdir().unwrap();
    let asm = write_asm(&dir, "add.asm", "ORG 0800H\nMVI A, 07h\nHLT\n");
    let bin = dir.path().join("add.bin");

    Command::cargo_bin("otto85")
        .unwrap()
        .args(["assemble"])
        .arg(&asm)
        .arg("-o")
        .arg(&bin)
        .assert()
        .success();

    let image = fs::read(&bin).unwrap();
    assert_eq!(image.len(), 0x10000);
    assert_eq!(&image[0x0800..0x0803], &[0x3E, 0x07, 0x76]);
}

#[test]
fn assemble_error_reports_location_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let asm = write_asm(&dir, "bad.asm", "NOP\nMOV M, M\n");

    let output = Command::cargo_bin("otto85")
        .unwrap()
        .args(["assemble"])
        .arg(&asm)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    // path:line:col: message, pointing at line 2
    assert!(stderr.contains("bad.asm:2:"), "stderr was: {stderr}");
    // No partial image escapes
    assert!(!dir.path().join("bad.bin").exists());
}

#[test]
fn check_passes_clean_source() {
    let dir = tempfile::tempdir().unwrap();
    let asm = write_asm(&dir, "ok.asm", "MVI A, 1\nHLT\n");

    Command::cargo_bin("otto85")
        .unwrap()
        .args(["check"])
        .arg(&asm)
        .assert()
        .success();
}

#[test]
fn run_executes_to_halt() {
    let dir = tempfile::tempdir().unwrap();
    let asm = write_asm(
        &dir,
        "add.asm",
        "ORG 0800H\nMVI A, 07h\nMVI B, 05h\nADD B\nHLT\n",
    );

    let output = Command::cargo_bin("otto85")
        .unwrap()
        .args(["run"])
        .arg(&asm)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("A=0C"), "stdout was: {stdout}");
}

#[test]
fn disasm_lists_mnemonics() {
    let dir = tempfile::tempdir().unwrap();
    let asm = write_asm(&dir, "add.asm", "ORG 0800H\nMVI A, 07h\nHLT\n");
    let bin = dir.path().join("add.bin");

    Command::cargo_bin("otto85")
        .unwrap()
        .args(["assemble"])
        .arg(&asm)
        .arg("-o")
        .arg(&bin)
        .assert()
        .success();

    let output = Command::cargo_bin("otto85")
        .unwrap()
        .args(["disasm"])
        .arg(&bin)
        .args(["--count", "8"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("MVI A, 07h"), "stdout was: {stdout}");
    assert!(stdout.contains("HLT"), "stdout was: {stdout}");
}
