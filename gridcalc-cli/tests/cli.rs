use std::path::PathBuf;
use std::process::Command;

fn demo_season() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/demo_season.json")
}

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "gridcalc-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn run_json(extra: &[&str], label: &str) -> serde_json::Value {
    let exe = env!("CARGO_BIN_EXE_gridcalc");
    let output_path = temp_path(label);
    let output = Command::new(exe)
        .arg("--season")
        .arg(demo_season())
        .args(["--report", "json", "--iterations", "500", "--output"])
        .arg(&output_path)
        .args(extra)
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = std::fs::read_to_string(output_path).expect("read output");
    serde_json::from_str(&content).expect("valid json report")
}

#[test]
fn cli_reports_title_odds_as_json() {
    let report = run_json(&[], "odds");
    assert_eq!(report["season"], "2031 Meridian Series");
    assert_eq!(report["remaining_events"], 4);
    let probabilities = report["simulation"]["probabilities"]
        .as_array()
        .expect("probabilities array");
    assert_eq!(probabilities.len(), 8);
    let wins: u64 = probabilities
        .iter()
        .map(|p| p["wins"].as_u64().unwrap_or_default())
        .sum();
    assert_eq!(wins, 500);
}

#[test]
fn cli_is_reproducible_for_a_seed() {
    let args = ["--seed", "42", "--workers", "3", "--mode", "form"];
    let first = run_json(&args, "seed-a");
    let second = run_json(&args, "seed-b");
    assert_eq!(first["simulation"], second["simulation"]);
}

#[test]
fn cli_solves_path_to_victory_and_projects() {
    let report = run_json(
        &[
            "--target",
            "Marchetti",
            "--projection-runs",
            "100",
            "--constraint",
            "2:Marchetti@1",
            "--constraint",
            "3:7>44",
        ],
        "victory",
    );
    assert_eq!(report["victory"]["name"], "Lena Marchetti");
    assert_eq!(report["victory"]["is_possible"], true);
    assert_eq!(report["victory"]["leader_points"], 92);
    assert_eq!(report["victory"]["max_possible_points"], 78 + 8 + 75);
    let steps = report["projection"]["steps"].as_array().expect("steps");
    assert_eq!(steps.len(), 5);

    let weekends = report["projection"]["history_steps"]
        .as_array()
        .expect("completed weekends");
    assert_eq!(weekends.len(), 4);
    let marchetti = report["projection"]["competitors"]
        .as_array()
        .expect("competitors")
        .iter()
        .find(|entry| entry["name"] == "Lena Marchetti")
        .expect("Marchetti projected");
    let history = marchetti["history"].as_array().expect("history");
    assert_eq!(history.len(), 4);
    assert_eq!(history.last().and_then(serde_json::Value::as_u64), Some(78));
}

#[test]
fn cli_writes_markdown() {
    let exe = env!("CARGO_BIN_EXE_gridcalc");
    let output_path = temp_path("markdown.md");
    let status = Command::new(exe)
        .arg("--season")
        .arg(demo_season())
        .args([
            "--report",
            "markdown",
            "--iterations",
            "100",
            "--target",
            "16",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("# 2031 Meridian Series Title Odds"));
    assert!(content.contains("## Path to Victory: Tomas Vance"));
}

#[test]
fn cli_rejects_conflicting_constraints() {
    let exe = env!("CARGO_BIN_EXE_gridcalc");
    let output = Command::new(exe)
        .arg("--season")
        .arg(demo_season())
        .args(["--constraint", "1:16@1,1:44@1"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1:44@1"), "stderr: {stderr}");
}

#[test]
fn cli_rewinds_with_as_of() {
    let report = run_json(&["--as-of", "2031-04-10"], "as-of");
    assert_eq!(report["as_of"], "2031-04-10");
    assert_eq!(report["remaining_events"], 5);
}
