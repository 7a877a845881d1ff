//! Integration tests for the `tk` CLI.
//!
//! Each test points `tk` at a temp data directory with `-D`, runs it as a
//! subprocess, and checks stdout and/or the stored JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Path to the built `tk` binary.
fn tk_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tk"))
}

fn data_dir(tmp: &tempfile::TempDir) -> PathBuf {
    tmp.path().join(".tasker")
}

/// Run `tk` against `dir`, returning (stdout, stderr, success).
fn run_tk(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tk_bin())
        .arg("-D")
        .arg(dir)
        .args(args)
        .env_remove("TASKER_DIR")
        .env_remove("TASKER_LOG")
        .output()
        .expect("failed to run tk");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `tk` expecting success, return stdout.
fn run_tk_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tk(dir, args);
    if !success {
        panic!(
            "tk {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// `tk add`/`tk sub` print the new id.
fn add(dir: &Path, args: &[&str]) -> String {
    run_tk_ok(dir, args).trim().to_string()
}

fn stored_tasks(dir: &Path) -> serde_json::Value {
    let raw = fs::read_to_string(dir.join("tasker-tasks.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

// ---------------------------------------------------------------------------
// Tree editing
// ---------------------------------------------------------------------------

#[test]
fn test_list_empty() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_tk_ok(&data_dir(&tmp), &["list"]);
    assert!(out.contains("no tasks yet"));
}

#[test]
fn test_add_and_sub_build_a_tree() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let home = add(&dir, &["add", "Clean home"]);
    add(&dir, &["sub", &home, "Kitchen", "-d", "15m"]);
    add(&dir, &["sub", &home, "Bathroom", "-d", "25m"]);

    let out = run_tk_ok(&dir, &["list"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("[ ] Clean home  40m  0/2"));
    assert!(lines[1].starts_with("  [ ] Kitchen  15m"));
    assert!(lines[2].starts_with("  [ ] Bathroom  25m"));

    let stored = stored_tasks(&dir);
    assert_eq!(stored[0]["subtasks"][0]["duration"], 900);
    assert_eq!(stored[0]["subtasks"][1]["status"], "to-do");
}

#[test]
fn test_add_uses_default_duration() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    add(&dir, &["add", "Water plants"]);
    assert_eq!(stored_tasks(&dir)[0]["duration"], 60);
}

#[test]
fn test_list_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let trip = add(&dir, &["add", "Plan trip"]);
    add(&dir, &["sub", &trip, "Book flights", "-d", "30m"]);

    let out = run_tk_ok(&dir, &["list", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json[0]["name"], "Plan trip");
    assert_eq!(json[0]["effective_duration"], 1800);
    assert_eq!(json[0]["progress"]["total"], 1);
    assert_eq!(json[0]["subtasks"][0]["name"], "Book flights");
}

#[test]
fn test_show_by_prefix() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let id = add(&dir, &["add", "Taxes", "-d", "1h"]);

    let out = run_tk_ok(&dir, &["show", &id[..8]]);
    assert!(out.contains("Taxes"));
    assert!(out.contains(&format!("id:        {}", id)));
    assert!(out.contains("duration:  1h"));
}

#[test]
fn test_show_not_found() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    add(&dir, &["add", "Taxes"]);
    let (_, stderr, success) = run_tk(&dir, &["show", "nope"]);
    assert!(!success);
    assert!(stderr.contains("error: no task matches \"nope\""));
}

#[test]
fn test_invalid_duration_is_rejected() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let (_, stderr, success) = run_tk(&dir, &["add", "Taxes", "-d", "soon"]);
    assert!(!success);
    assert!(stderr.contains("invalid duration"));
    assert!(!dir.join("tasker-tasks.json").exists());
}

#[test]
fn test_rename_with_blank_name_uses_fallback() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let id = add(&dir, &["add", "Taxes"]);
    let out = run_tk_ok(&dir, &["rename", &id, "   "]);
    assert!(out.contains("New task"));
}

#[test]
fn test_mv_reorders_siblings() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    add(&dir, &["add", "First"]);
    let second = add(&dir, &["add", "Second"]);
    run_tk_ok(&dir, &["mv", &second, "up"]);

    let stored = stored_tasks(&dir);
    assert_eq!(stored[0]["name"], "Second");
    assert_eq!(stored[1]["name"], "First");
}

#[test]
fn test_done_propagates_and_reopen_reverts() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let home = add(&dir, &["add", "Clean home"]);
    let kitchen = add(&dir, &["sub", &home, "Kitchen"]);
    let bath = add(&dir, &["sub", &home, "Bathroom"]);

    run_tk_ok(&dir, &["done", &kitchen]);
    assert_eq!(stored_tasks(&dir)[0]["status"], "to-do");

    run_tk_ok(&dir, &["done", &bath]);
    assert_eq!(stored_tasks(&dir)[0]["status"], "done");
    assert!(run_tk_ok(&dir, &["list", "--open"]).trim().is_empty());

    run_tk_ok(&dir, &["reopen", &bath]);
    let stored = stored_tasks(&dir);
    assert_eq!(stored[0]["status"], "to-do");
    assert_eq!(stored[0]["subtasks"][0]["status"], "done");
}

#[test]
fn test_sub_under_finished_parent_reopens_it() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let home = add(&dir, &["add", "Clean home"]);
    run_tk_ok(&dir, &["done", &home]);
    add(&dir, &["sub", &home, "Windows"]);
    assert_eq!(stored_tasks(&dir)[0]["status"], "to-do");
}

#[test]
fn test_rm_removes_subtree() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let home = add(&dir, &["add", "Clean home"]);
    add(&dir, &["sub", &home, "Kitchen"]);
    add(&dir, &["add", "Taxes"]);

    run_tk_ok(&dir, &["rm", &home]);
    let stored = stored_tasks(&dir);
    assert_eq!(stored.as_array().unwrap().len(), 1);
    assert_eq!(stored[0]["name"], "Taxes");
}

#[test]
fn test_image_set_and_clear() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let id = add(&dir, &["add", "Taxes"]);
    let png = tmp.path().join("pic.png");
    fs::write(&png, b"\x89PNG fake").unwrap();

    run_tk_ok(&dir, &["image", "set", &id, png.to_str().unwrap()]);
    let stored = stored_tasks(&dir);
    let image_id = stored[0]["image"]["imageId"].as_str().unwrap().to_string();
    let blob = dir.join("images").join(format!("{}.png", image_id));
    assert!(blob.exists());

    run_tk_ok(&dir, &["image", "clear", &id]);
    assert!(stored_tasks(&dir)[0].get("image").is_none());
    assert!(!blob.exists());
}

// ---------------------------------------------------------------------------
// Statistics and achievements
// ---------------------------------------------------------------------------

#[test]
fn test_stats_on_fresh_store() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_tk_ok(&data_dir(&tmp), &["stats"]);
    assert!(out.contains("completed:            0"));

    let out = run_tk_ok(&data_dir(&tmp), &["stats", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["totalCompleted"], 0);
}

#[test]
fn test_achievements_list_and_revoke() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("tasker-statistics.json"),
        r#"{"totalCompleted":1,"unlockedAchievements":["1"]}"#,
    )
    .unwrap();

    let out = run_tk_ok(&dir, &["achievements"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 9);
    assert!(lines[0].starts_with("[x] 1  Success"));
    assert!(lines[1].starts_with("[ ] 2"));

    let out = run_tk_ok(&dir, &["achievements", "revoke", "1"]);
    assert!(out.contains("revoked 1: Success"));
    let out = run_tk_ok(&dir, &["achievements", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json[0]["unlocked"], false);
}

#[test]
fn test_revoke_unknown_achievement_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_tk(&data_dir(&tmp), &["achievements", "revoke", "42"]);
    assert!(!success);
    assert!(stderr.contains("unknown achievement"));
}

// ---------------------------------------------------------------------------
// Config and services
// ---------------------------------------------------------------------------

#[test]
fn test_config_set_changes_defaults() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    run_tk_ok(&dir, &["config", "set", "tasks.default_duration", "300"]);
    let toml = fs::read_to_string(dir.join("tasker.toml")).unwrap();
    assert!(toml.contains("default_duration = 300"));

    add(&dir, &["add", "Stretch"]);
    assert_eq!(stored_tasks(&dir)[0]["duration"], 300);

    let out = run_tk_ok(&dir, &["config", "show"]);
    assert!(out.contains("default_duration = 300"));
}

#[test]
fn test_config_set_rejects_unknown_keys() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_tk(&data_dir(&tmp), &["config", "set", "tasks.colour", "red"]);
    assert!(!success);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_decompose_without_service_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let id = add(&dir, &["add", "Plan trip"]);
    let (_, stderr, success) = run_tk(&dir, &["decompose", &id]);
    assert!(!success);
    assert!(stderr.contains("service.decompose_url is not configured"));
}

#[test]
fn test_decompose_appends_proposed_subtasks() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/decompose")
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"success":true,"subtasks":[{"title":"Pick dates"},{"title":"Book flights"}]}"#,
        )
        .create();

    let tmp = tempfile::TempDir::new().unwrap();
    let dir = data_dir(&tmp);
    let url = format!("{}/decompose", server.url());
    run_tk_ok(&dir, &["config", "set", "service.decompose_url", &url]);
    let id = add(&dir, &["add", "Plan trip"]);

    let out = run_tk_ok(&dir, &["decompose", &id]);
    mock.assert();
    assert!(out.contains("Pick dates"));
    let stored = stored_tasks(&dir);
    assert_eq!(stored[0]["subtasks"][0]["name"], "Pick dates");
    assert_eq!(stored[0]["subtasks"][1]["name"], "Book flights");
    assert_eq!(stored[0]["subtasks"][1]["duration"], 60);
}
