//! 命令行入口测试（不上线任何机器人）

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_help_lists_flags() {
    Command::cargo_bin("blossom-cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--names"))
        .stdout(predicate::str::contains("--list-robots"))
        .stdout(predicate::str::contains("--browser-disable"));
}

#[test]
fn test_list_robots_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("robots.toml");
    fs::write(
        &config,
        r#"
[woody.motors.tower_1]
id = 1

[buzz.motors.tower_1]
id = 1
angle_limit = [-150.0, 150.0]
"#,
    )
    .unwrap();

    Command::cargo_bin("blossom-cli")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("-l")
        .assert()
        .success()
        .stdout(predicate::eq("buzz\nwoody\n"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("robots.toml");
    fs::write(&config, "[woody.motors]\n").unwrap();

    Command::cargo_bin("blossom-cli")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--list-robots")
        .assert()
        .failure();
}

#[test]
fn test_unknown_robot_fails_before_bring_up() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("robots.toml");
    fs::write(&config, "[woody.motors.tower_1]\nid = 1\n").unwrap();

    Command::cargo_bin("blossom-cli")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .args(["-n", "rex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rex"));
}
