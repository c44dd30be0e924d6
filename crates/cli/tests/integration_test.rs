use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

fn parlay_risk(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_parlay-risk"))
        .current_dir(dir)
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("failed to run parlay-risk")
}

#[test]
fn test_simulate_outputs_json() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("ticket.json"),
        r#"{"stake": 10, "legs": [
            {"description": "A", "american_odds": 150},
            {"description": "B", "american_odds": 150},
            {"description": "C", "american_odds": 150}
        ]}"#,
    )
    .unwrap();

    let output = parlay_risk(
        dir.path(),
        &["simulate", "--parlay", "ticket.json", "-n", "20000", "--seed", "3", "--no-upsets"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["iterations"], 20000);
    let win_rate = json["win_rate"].as_f64().unwrap();
    assert!((win_rate - 0.064).abs() < 0.01, "win rate {win_rate}");
}

#[test]
fn test_what_if_writes_csv() {
    let dir = tempdir().unwrap();
    let output = parlay_risk(
        dir.path(),
        &[
            "what-if", "--win-prob", "0.55", "--odds", "2.0", "--days", "5", "-n", "100",
            "--seed", "1", "--csv", "chart.csv", "--format", "text",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Quarter Kelly"));

    let csv = fs::read_to_string(dir.path().join("chart.csv")).unwrap();
    assert_eq!(csv.lines().count(), 7);
}

#[test]
fn test_missing_file_fails() {
    let dir = tempdir().unwrap();
    let output = parlay_risk(dir.path(), &["correlation", "--parlay", "missing.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}
