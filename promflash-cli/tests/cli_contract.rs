//! CLI contract tests: argument surface, exit codes, and stable output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn promflash() -> Command {
    let mut cmd = Command::cargo_bin("promflash").expect("binary builds");
    cmd.env_remove("PROMFLASH_PORT");
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_succeeds() {
    promflash()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("promflash"))
        .stdout(predicate::str::contains("flash"))
        .stdout(predicate::str::contains("checksum"))
        .stdout(predicate::str::contains("list-ports"));
}

#[test]
fn test_version_succeeds() {
    promflash()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("promflash"));
}

#[test]
fn test_no_args_shows_usage() {
    promflash().assert().failure().code(2);
}

#[test]
fn test_unknown_subcommand_exits_2() {
    promflash().arg("frobnicate").assert().failure().code(2);
}

#[test]
fn test_checksum_known_content() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0x01, 0x02, 0x03, 0xFF]).unwrap();

    promflash()
        .arg("checksum")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("4 bytes"))
        .stdout(predicate::str::contains("checksum 261"));
}

#[test]
fn test_checksum_empty_file() {
    let file = tempfile::NamedTempFile::new().unwrap();

    promflash()
        .arg("checksum")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0 bytes"))
        .stdout(predicate::str::contains("checksum 0"));
}

#[test]
fn test_checksum_missing_file_exits_1() {
    promflash()
        .arg("checksum")
        .arg("/nonexistent/image.bin")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_list_ports_json_is_valid() {
    let output = promflash()
        .arg("list-ports")
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert!(parsed.is_array());
}

#[test]
fn test_flash_missing_image_fails() {
    promflash()
        .arg("--non-interactive")
        .arg("flash")
        .arg("/nonexistent/image.bin")
        .assert()
        .failure()
        .stderr(predicate::str::contains("image"));
}

#[test]
fn test_completions_bash() {
    promflash()
        .arg("completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("promflash"));
}

#[test]
fn test_config_flag_accepts_missing_file() {
    // A missing --config path degrades to defaults rather than aborting.
    promflash()
        .arg("--config")
        .arg("/nonexistent/promflash.toml")
        .arg("checksum")
        .arg("/nonexistent/image.bin")
        .assert()
        .failure()
        .code(1);
}
