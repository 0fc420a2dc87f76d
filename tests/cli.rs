use std::fs;
use std::process::Command;

const SHEET: &str = concat!(
    r#"{"sheet":"push-pop","cells":{"B1":"create","C1":"Stack"}}"#,
    "\n",
    r#"{"sheet":"push-pop","cells":{"A2":1,"B2":"push","C2":"A1","D2":1}}"#,
    "\n",
    r#"{"sheet":"push-pop","cells":{"A3":1,"B3":"pop","C3":"A1"}}"#,
    "\n",
);

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sequence-arena"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn run_prints_one_observation_per_cell() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = dir.path().join("push-pop.jsonl");
    fs::write(&sheet, SHEET).unwrap();

    let output = bin()
        .current_dir(dir.path())
        .arg("run")
        .arg(&sheet)
        .output()
        .expect("failed to run sequence-arena");
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let rows: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    // Two candidates, three outputs each plus the captured push argument.
    assert_eq!(rows.len(), 8);
    assert!(rows
        .iter()
        .filter(|row| row["row"] == 3)
        .all(|row| row["verdict"] == "pass" && row["execution"] == "push-pop"));
}

#[test]
fn check_fails_on_unbindable_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = dir.path().join("broken.jsonl");
    fs::write(
        &sheet,
        concat!(
            r#"{"sheet":"broken","cells":{"B1":"create","C1":"Stack"}}"#,
            "\n",
            r#"{"sheet":"broken","cells":{"B2":"push","C2":"A5","D2":1}}"#,
            "\n",
        ),
    )
    .unwrap();
    let config = dir.path().join("arena.toml");
    fs::write(&config, "[logging]\nansi = false\n").unwrap();

    let output = bin()
        .arg("check")
        .arg(&sheet)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("failed to run sequence-arena");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("A5"), "missing reference in:\n{stderr}");
}

#[test]
fn malformed_records_are_reported_with_their_line() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = dir.path().join("bad.jsonl");
    fs::write(&sheet, "{\"sheet\":\"s\",\"cells\":{\"C1\":\"x\"}}\n").unwrap();
    let output = bin()
        .current_dir(dir.path())
        .arg("run")
        .arg(&sheet)
        .output()
        .expect("failed to run sequence-arena");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no operation cell"), "unexpected stderr:\n{stderr}");
}
