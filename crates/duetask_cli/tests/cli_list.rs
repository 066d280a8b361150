use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("duetask-{nanos}-{name}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn duetask(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_duetask"));
    command
        .env("DUETASK_STORE_DIR", dir)
        .env("DUETASK_CONFIG_PATH", dir.join("config.json"))
        .env("DUETASK_DISABLE_NOTIFICATIONS", "1")
        .env_remove("DUETASK_LOG");
    command
}

fn add(dir: &Path, text: &str, in_days: u32) {
    let days = in_days.to_string();
    let output = duetask(dir)
        .args(["add", text, "--in-days", days.as_str()])
        .output()
        .expect("failed to run add");
    assert!(output.status.success());
}

fn list_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = duetask(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("failed to run list");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

fn texts(section: &serde_json::Value) -> Vec<String> {
    section
        .as_array()
        .expect("section array")
        .iter()
        .map(|task| task["text"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn list_splits_by_priority_window() {
    let dir = temp_dir("list-sections");
    add(&dir, "Next month", 30);
    add(&dir, "Boundary", 7);
    add(&dir, "Tomorrow", 1);
    add(&dir, "Just past", 8);

    let payload = list_json(&dir, &["list"]);
    let plain = duetask(&dir)
        .arg("list")
        .output()
        .expect("failed to run list");
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(texts(&payload["high_priority"]), vec!["Tomorrow", "Boundary"]);
    assert_eq!(texts(&payload["normal"]), vec!["Just past", "Next month"]);
    assert_eq!(payload["completed"], serde_json::json!([]));
    assert_eq!(payload["high_priority"][0]["days_until_due"], 1);

    let stdout = String::from_utf8_lossy(&plain.stdout);
    assert!(stdout.contains("High Priority Tasks"));
    assert!(stdout.contains("Normal Tasks"));
    assert!(!stdout.contains("Completed Tasks"));
    assert!(stdout.contains("7 days left"));
}

#[test]
fn list_high_shows_only_that_section() {
    let dir = temp_dir("list-high");
    add(&dir, "Soon", 2);
    add(&dir, "Later", 20);

    let payload = list_json(&dir, &["list", "high"]);
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(texts(&payload["high_priority"]), vec!["Soon"]);
    assert!(payload.get("normal").is_none());
    assert!(payload.get("completed").is_none());
}

#[test]
fn high_priority_window_is_configurable() {
    let dir = temp_dir("list-window");
    add(&dir, "Soon", 2);

    let payload = list_json(
        &dir,
        &["--config-override", "high_priority_days=1", "list"],
    );
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(payload["high_priority"], serde_json::json!([]));
    assert_eq!(texts(&payload["normal"]), vec!["Soon"]);
}

#[test]
fn list_reads_legacy_and_damaged_records() {
    let dir = temp_dir("list-legacy");
    std::fs::write(
        dir.join("tasks.json"),
        serde_json::json!([
            { "key": "legacy-1", "value": "Legacy entry", "dueDate": "2099-01-01" },
            { "id": "broken-1", "text": "Bad date", "dueDate": "not a date" }
        ])
        .to_string(),
    )
    .unwrap();

    let payload = list_json(&dir, &["list"]);
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(texts(&payload["high_priority"]), vec!["Bad date"]);
    assert_eq!(payload["high_priority"][0]["days_until_due"], 0);
    assert_eq!(payload["normal"][0]["id"], "legacy-1");
    assert_eq!(payload["normal"][0]["text"], "Legacy entry");
}

#[test]
fn iso_date_style_override() {
    let dir = temp_dir("list-iso");
    std::fs::write(
        dir.join("tasks.json"),
        serde_json::json!([
            { "id": "task-1", "text": "Far away", "dueDate": "2099-03-04" }
        ])
        .to_string(),
    )
    .unwrap();

    let output = duetask(&dir)
        .args(["--config-override", "date_style=iso", "list"])
        .output()
        .expect("failed to run list");
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2099-03-04"));
    assert!(!stdout.contains("4/3/2642"));
}
