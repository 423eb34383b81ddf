use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn cartsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cartsync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG")
        .env_remove("CARTSYNC_LOG_FORMAT");
    cmd
}

struct Setup {
    home: TempDir,
    notes: PathBuf,
    shop: PathBuf,
}

/// Two checklist directories wired up in `~/.cartsync/config.yaml`.
fn setup(note_md: &str, shop_md: &str, extra: &str) -> Setup {
    let home = TempDir::new().expect("home");
    let notes = home.path().join("notes");
    let shop = home.path().join("shop");
    fs::create_dir_all(&notes).unwrap();
    fs::create_dir_all(&shop).unwrap();
    fs::write(notes.join("Groceries.md"), note_md).unwrap();
    fs::write(shop.join("Groceries.md"), shop_md).unwrap();

    let config = format!(
        "interval_minutes: 0\n{extra}note:\n  kind: checklist\n  dir: '{}'\nshopping:\n  kind: checklist\n  dir: '{}'\n  list: Groceries\n",
        notes.display(),
        shop.display()
    );
    let config_dir = home.path().join(".cartsync");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.yaml"), config).unwrap();

    Setup { home, notes, shop }
}

fn read(dir: &Path) -> String {
    fs::read_to_string(dir.join("Groceries.md")).unwrap()
}

#[test]
fn init_writes_template_once() {
    let home = TempDir::new().expect("home");
    cartsync_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Wrote starter config"));
    assert!(home.path().join(".cartsync/config.yaml").exists());

    cartsync_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("already exists"));
}

#[test]
fn once_merges_both_lists() {
    let s = setup("- [ ] milk\n- [ ] eggs\n", "- [ ] eggs\n- [ ] bread\n", "");
    cartsync_cmd(s.home.path())
        .arg("once")
        .assert()
        .success()
        .stdout(contains("Pass complete"))
        .stdout(contains("seeded"));

    assert_eq!(read(&s.notes), "- [ ] milk\n- [ ] eggs\n- [ ] bread\n");
    assert_eq!(read(&s.shop), "- [ ] eggs\n- [ ] bread\n- [ ] milk\n");

    cartsync_cmd(s.home.path())
        .arg("once")
        .assert()
        .success()
        .stdout(contains("already in sync"));
}

#[test]
fn dry_run_json_changes_nothing() {
    let s = setup("- [ ] milk\n", "- [ ] bread\n", "");
    let output = cartsync_cmd(s.home.path())
        .args(["once", "--dry-run", "--json"])
        .output()
        .expect("run cartsync once --dry-run --json");
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["seeded"], true);
    assert_eq!(report["baseline_saved"], false);
    assert_eq!(report["fates"]["milk"]["fate"], "copied");

    assert_eq!(read(&s.notes), "- [ ] milk\n");
    assert_eq!(read(&s.shop), "- [ ] bread\n");
    assert!(!s.home.path().join(".cartsync/baseline.json").exists());
}

#[test]
fn plan_shows_fate_per_item() {
    let s = setup("- [ ] milk\n- [ ] eggs\n", "- [ ] eggs\n", "");
    cartsync_cmd(s.home.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(contains("milk"))
        .stdout(contains("new on note"))
        .stdout(contains("kept"));
    assert_eq!(read(&s.shop), "- [ ] eggs\n");
}

#[test]
fn deletion_propagates_across_runs() {
    let s = setup("- [ ] milk\n- [ ] eggs\n", "- [ ] milk\n- [ ] eggs\n", "");
    cartsync_cmd(s.home.path()).arg("once").assert().success();

    fs::write(s.shop.join("Groceries.md"), "- [ ] milk\n- [x] eggs\n").unwrap();
    cartsync_cmd(s.home.path())
        .arg("once")
        .assert()
        .success()
        .stdout(contains("eggs"));
    assert_eq!(read(&s.notes), "- [ ] milk\n");
}

#[test]
fn run_with_zero_interval_runs_one_pass() {
    let s = setup("- [ ] milk\n", "", "");
    cartsync_cmd(s.home.path())
        .args(["run", "--interval", "0"])
        .assert()
        .success()
        .stdout(contains("Stopped after 1 passes"));
    assert_eq!(read(&s.shop), "- [ ] milk\n");
}

#[test]
fn mode_flag_overrides_config() {
    let s = setup("- [ ] milk\n", "- [ ] bread\n", "sync_mode: bidirectional\n");
    cartsync_cmd(s.home.path())
        .args(["once", "--mode", "mirror-from-shopping"])
        .assert()
        .success();
    assert_eq!(read(&s.notes), "- [ ] bread\n");
}

#[test]
fn oversized_interval_is_rejected() {
    let s = setup("- [ ] milk\n", "", "");
    cartsync_cmd(s.home.path())
        .args(["run", "--interval", "18446744073709551615"])
        .assert()
        .failure()
        .stderr(contains("interval_minutes"));
    assert_eq!(read(&s.shop), "");
}

#[test]
fn baseline_show_and_reset() {
    let s = setup("- [ ] milk\n", "- [ ] milk\n", "");
    cartsync_cmd(s.home.path())
        .args(["baseline", "show"])
        .assert()
        .success()
        .stdout(contains("No baseline yet"));

    cartsync_cmd(s.home.path()).arg("once").assert().success();

    cartsync_cmd(s.home.path())
        .args(["baseline", "show"])
        .assert()
        .success()
        .stdout(contains("1 items"))
        .stdout(contains("milk"));

    let output = cartsync_cmd(s.home.path())
        .args(["baseline", "show", "--json"])
        .output()
        .unwrap();
    let file: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(file["items"], serde_json::json!(["milk"]));

    cartsync_cmd(s.home.path())
        .args(["baseline", "reset"])
        .assert()
        .success()
        .stdout(contains("Baseline removed"));
    assert!(!s.home.path().join(".cartsync/baseline.json").exists());
}

#[test]
fn lists_marks_selected_list() {
    let s = setup("- [ ] milk\n", "- [ ] milk\n", "");
    fs::write(s.shop.join("Hardware.md"), "").unwrap();
    let output = cartsync_cmd(s.home.path())
        .args(["lists", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let entries = entries.as_array().expect("array");
    assert_eq!(entries.len(), 3);
    let selected: Vec<_> = entries
        .iter()
        .filter(|e| e["selected"] == true)
        .map(|e| (e["side"].as_str().unwrap(), e["name"].as_str().unwrap()))
        .collect();
    assert_eq!(selected, vec![("note", "Groceries"), ("shopping", "Groceries")]);
}

#[test]
fn missing_config_fails_with_hint() {
    let home = TempDir::new().expect("home");
    cartsync_cmd(home.path())
        .arg("once")
        .assert()
        .failure()
        .stderr(contains("cartsync init"));
}

#[test]
fn unreachable_side_fails_with_nonzero_exit() {
    let s = setup("- [ ] milk\n", "- [ ] milk\n", "");
    fs::remove_dir_all(&s.shop).unwrap();
    cartsync_cmd(s.home.path())
        .arg("once")
        .assert()
        .failure()
        .stderr(contains("unavailable"));
    assert_eq!(read(&s.notes), "- [ ] milk\n");
}

#[test]
fn unknown_list_name_fails() {
    let s = setup("- [ ] milk\n", "- [ ] milk\n", "");
    let config_path = s.home.path().join(".cartsync/config.yaml");
    let config = fs::read_to_string(&config_path)
        .unwrap()
        .replace("list: Groceries", "list: Hardware");
    fs::write(&config_path, config).unwrap();

    cartsync_cmd(s.home.path())
        .args(["run", "--interval", "0"])
        .assert()
        .failure()
        .stderr(contains("Hardware"));
}
