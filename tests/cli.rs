//! The rd-nurse binary: report format and exit codes

use std::io::Write;
use std::process::{Command, Output, Stdio};

const LEVEL: &str = r#"{
  "rows": [ { "row": 0 } ],
  "events": [
    { "bar": 1, "beat": 1, "type": "SayReadyGetSetGo", "phraseToSay": "SayReaDyGetSetGoNew", "tick": 1 },
    { "bar": 1, "beat": 5, "row": 0, "type": "AddOneshotBeat", "tick": 1, "loops": 1, "interval": 2 },
    { "bar": 1, "beat": 11, "type": "FinishLevel" }
  ]
}"#;

fn rd_nurse(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_rd-nurse"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    // The binary may exit before reading, e.g. on a usage error
    let _ = child.stdin.take().unwrap().write_all(stdin.as_bytes());
    child.wait_with_output().unwrap()
}

#[test]
fn test_findings_exit_one() {
    let output = rd_nurse(&[], LEVEL);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Missing hit: 2-2\n");
}

#[test]
fn test_clean_level_exits_zero() {
    let clean = LEVEL.replace("\"loops\": 1", "\"loops\": 2");
    let output = rd_nurse(&[], &clean);
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_json_output() {
    let output = rd_nurse(&["--json"], LEVEL);
    assert_eq!(output.status.code(), Some(1));
    let findings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(findings[0]["kind"], "missing_hit");
    assert!(findings[0]["time"].as_f64().is_some());
}

#[test]
fn test_level_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LEVEL.as_bytes()).unwrap();
    let path = file.path().to_str().unwrap();
    let output = rd_nurse(&[path], "");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Missing hit: 2-2\n");
}

#[test]
fn test_empty_input_is_usage_error() {
    let output = rd_nurse(&[], "");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}

#[test]
fn test_malformed_level() {
    let output = rd_nurse(&[], "{ \"events\": [");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("syntax error"));
}

#[test]
fn test_config_file_options() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "ignore-voice-source = true").unwrap();
    let ian_go = LEVEL.replace(
        "{ \"bar\": 1, \"beat\": 11",
        "{ \"bar\": 1, \"beat\": 8, \"type\": \"SayReadyGetSetGo\", \"phraseToSay\": \"JustSayGo\", \"voiceSource\": \"IanSlow\", \"tick\": 1 },\n    { \"bar\": 1, \"beat\": 11",
    );

    let output = rd_nurse(&[], &ian_go);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Invalid cue: 1-8"));

    let path = config.path().to_str().unwrap();
    let output = rd_nurse(&["--config", path], &ian_go);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Invalid cue"));
}

#[test]
fn test_unknown_flag() {
    let output = rd_nurse(&["--no-such-flag"], LEVEL);
    assert_eq!(output.status.code(), Some(2));
}
