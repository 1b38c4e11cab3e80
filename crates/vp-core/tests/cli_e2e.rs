//! End-to-end tests for the vp-core binary.
//!
//! Every test runs against its own temporary data and config directories so
//! nothing leaks between tests or from the host.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::process::Stdio;
use tempfile::TempDir;
use vp_config::OverflowPolicy;
use vp_core::sequential::{ModelState, SequentialUpdater};
use vp_math::{LikelihoodRatio, Scale};

struct Sandbox {
    data: TempDir,
    config: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Sandbox {
            data: TempDir::new().unwrap(),
            config: TempDir::new().unwrap(),
        }
    }

    /// A vp-core command isolated from the host environment.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("vp-core").expect("vp-core binary should exist");
        cmd.env_clear()
            .env("XDG_CONFIG_HOME", self.config.path())
            .env("XDG_DATA_HOME", self.data.path())
            .arg("--data-dir")
            .arg(self.data.path())
            .arg("--config")
            .arg(self.config.path());
        cmd
    }

    /// Same isolation as [`Sandbox::cmd`], as a spawnable std command.
    fn spawnable(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin("vp-core"));
        cmd.env_clear()
            .env("XDG_CONFIG_HOME", self.config.path())
            .env("XDG_DATA_HOME", self.data.path())
            .arg("--data-dir")
            .arg(self.data.path())
            .arg("--config")
            .arg(self.config.path());
        cmd
    }

    fn as_caller(&self, caller: &str) -> Command {
        let mut cmd = self.cmd();
        cmd.args(["--caller", caller]);
        cmd
    }

    fn init(&self, owner: &str) {
        self.as_caller(owner)
            .args(["init", "--owner", owner])
            .assert()
            .success();
    }
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn json_stderr(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stderr).expect("stderr should be JSON")
}

// ============================================================================
// Metadata commands
// ============================================================================

#[test]
fn version_reports_schema() {
    let sb = Sandbox::new();
    let output = sb.cmd().arg("version").output().unwrap();
    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["schema_version"], "1.0.0");
    assert!(json["vp_core_version"].is_string());
}

#[test]
fn schema_list_names_priors() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["schema", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Priors"))
        .stdout(predicate::str::contains("ModelSnapshot"));
}

#[test]
fn unknown_schema_is_an_argument_error() {
    let sb = Sandbox::new();
    sb.cmd().args(["schema", "Nope"]).assert().code(10);
}

#[test]
fn check_passes_on_defaults() {
    let sb = Sandbox::new();
    let output = sb.cmd().arg("check").output().unwrap();
    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["status"], "ok");
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn posterior_is_pure_and_needs_no_owner() {
    let sb = Sandbox::new();
    let output = sb
        .cmd()
        .args(["posterior", "--class", "pph", "--proximity", "close"])
        .output()
        .unwrap();
    assert!(output.status.success());
    // 60·35 / (60·35 + 40·10) over scale 100.
    assert_eq!(json_stdout(&output)["posterior"], 84);
    assert!(!sb.data.path().join("audit").exists());
}

#[test]
fn predict_records_trace_and_decision() {
    let sb = Sandbox::new();
    sb.init("admin");

    let output = sb
        .as_caller("dr-lee")
        .args(["predict", "--proximity", "far", "--device-data", "true"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["command"], "predict");
    assert_eq!(json["result"]["predicted"], "ppr");

    let log = std::fs::read_to_string(sb.data.path().join("audit").join("audit.jsonl")).unwrap();
    let kinds: Vec<String> = log
        .lines()
        .map(|line| {
            let entry: Value = serde_json::from_str(line).unwrap();
            entry["record"]["kind"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(kinds, ["owner_initialized", "inference_trace", "decision"]);
}

#[test]
fn summary_format_is_one_line() {
    let sb = Sandbox::new();
    sb.init("admin");
    sb.as_caller("admin")
        .args(["-f", "summary", "predict", "--proximity", "very-close"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("pph"));
}

// ============================================================================
// Sequential model and access control
// ============================================================================

#[test]
fn stateful_commands_require_initialization() {
    let sb = Sandbox::new();
    let output = sb
        .as_caller("dr-lee")
        .args(["submit", "--id", "a", "--ratio", "300"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(15));
    assert_eq!(json_stderr(&output)["error"]["code"], 21);
}

#[test]
fn missing_caller_is_an_argument_error() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["predict"])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("caller"));
}

#[test]
fn second_init_is_refused() {
    let sb = Sandbox::new();
    sb.init("admin");
    sb.as_caller("other")
        .args(["init", "--owner", "other"])
        .assert()
        .code(15);
}

#[test]
fn sequential_workflow() {
    let sb = Sandbox::new();
    sb.init("admin");

    let output = sb
        .as_caller("dr-lee")
        .args(["submit", "--id", "visit-1", "--ratio", "300"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let state = &json_stdout(&output)["state"];
    assert_eq!(state["posterior"], 75);
    assert_eq!(state["step"], 1);
    assert_eq!(state["complexity"], 2);

    // Duplicate identifier: rejected, nothing changes.
    sb.as_caller("dr-lee")
        .args(["submit", "--id", "visit-1", "--ratio", "10"])
        .assert()
        .code(4);

    sb.as_caller("dr-lee")
        .args(["submit-type", "--type", "2", "--ratio", "100"])
        .assert()
        .success();
    sb.as_caller("dr-lee")
        .args(["submit-type", "--type", "9", "--ratio", "100"])
        .assert()
        .code(4);

    let output = sb
        .as_caller("dr-lee")
        .args(["evidence", "--index", "1"])
        .output()
        .unwrap();
    assert_eq!(json_stdout(&output)["record"]["id"], "confirmation");

    sb.as_caller("dr-lee")
        .args(["evidence", "--index", "5"])
        .assert()
        .code(4);

    let output = sb.as_caller("dr-lee").arg("state").output().unwrap();
    let state = &json_stdout(&output)["state"];
    assert_eq!(state["step"], 2);
    assert_eq!(state["evidence_count"], 2);
}

#[test]
fn parallel_submissions_are_serialized() {
    const RUNS: usize = 16;
    let sb = Sandbox::new();
    sb.init("admin");

    let children: Vec<_> = (0..RUNS)
        .map(|i| {
            sb.spawnable()
                .args(["--caller", "dr-lee", "submit", "--ratio", "150", "--id"])
                .arg(format!("visit-{i}"))
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .expect("spawn vp-core")
        })
        .collect();
    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    // Equal ratios commute, so the order the runs got the lock in is moot.
    let updater = SequentialUpdater::new(Scale::PERCENT, OverflowPolicy::Saturate);
    let mut expected = ModelState::initial(Scale::PERCENT);
    for i in 0..RUNS {
        expected = updater
            .submit(&expected, &format!("visit-{i}"), LikelihoodRatio::new(150))
            .unwrap()
            .state;
    }

    let output = sb.as_caller("dr-lee").arg("state").output().unwrap();
    let state = &json_stdout(&output)["state"];
    assert_eq!(state["step"], RUNS as u64);
    assert_eq!(state["evidence_count"], RUNS as u64);
    assert_eq!(state["complexity"], 1u64 << RUNS);
    assert_eq!(state["posterior"], expected.posterior.raw());

    // One owner record plus two entries per submission, all on one chain.
    let output = sb.cmd().args(["audit", "verify"]).output().unwrap();
    assert!(output.status.success());
    let verification = &json_stdout(&output)["verification"];
    assert_eq!(verification["is_valid"], true);
    assert_eq!(verification["entries_verified"], 1 + 2 * RUNS as u64);
}

#[test]
fn owner_only_commands() {
    let sb = Sandbox::new();
    sb.init("admin");

    sb.as_caller("mallory")
        .args(["reset", "--prior", "10"])
        .assert()
        .code(12);
    sb.as_caller("mallory")
        .args(["transfer-owner", "--to", "mallory"])
        .assert()
        .code(12);
    sb.as_caller("mallory")
        .args(["complex-inference", "--id", "w"])
        .assert()
        .code(12);

    let output = sb
        .as_caller("admin")
        .args(["complex-inference", "--id", "w"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["iterations"], 1);
    assert_eq!(json["state"]["step"], 1);

    let output = sb
        .as_caller("admin")
        .args(["reset", "--prior", "20"])
        .output()
        .unwrap();
    let state = &json_stdout(&output)["state"];
    assert_eq!(state["prior"], 20);
    assert_eq!(state["step"], 0);

    sb.as_caller("admin")
        .args(["reset", "--prior", "101"])
        .assert()
        .code(4);

    sb.as_caller("admin")
        .args(["transfer-owner", "--to", "dr-park"])
        .assert()
        .success();
    let output = sb.cmd().arg("owner").output().unwrap();
    assert_eq!(json_stdout(&output)["owner"], "dr-park");
}

// ============================================================================
// Configuration and audit
// ============================================================================

#[test]
fn invalid_priors_file_is_rejected() {
    let sb = Sandbox::new();
    let path = sb.config.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"schema_version":"1.0.0","scale":100,"classes":{
            "pph":{"prior":70,"proximity":{"very_close":25,"close":25,"near":25,"far":25},
                   "confirmation":50,"prescription":50,"device_data":50},
            "ppr":{"prior":40,"proximity":{"very_close":25,"close":25,"near":25,"far":25},
                   "confirmation":50,"prescription":50,"device_data":50}}}"#,
    )
    .unwrap();

    sb.cmd()
        .arg("--priors")
        .arg(&path)
        .args(["posterior", "--class", "ppr"])
        .assert()
        .code(10);
}

#[test]
fn engine_version_mismatch_exits_13() {
    let sb = Sandbox::new();
    std::fs::write(
        sb.config.path().join("engine.json"),
        r#"{"schema_version":"9.0.0"}"#,
    )
    .unwrap();
    sb.cmd()
        .args(["posterior", "--class", "pph"])
        .assert()
        .code(13);
}

#[test]
fn audit_verify_detects_tampering() {
    let sb = Sandbox::new();
    sb.init("admin");
    sb.as_caller("admin")
        .args(["reset", "--prior", "30"])
        .assert()
        .success();

    let output = sb.cmd().args(["audit", "verify"]).output().unwrap();
    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["verification"]["is_valid"], true);
    assert_eq!(json["verification"]["entries_verified"], 2);

    let path = sb.data.path().join("audit").join("audit.jsonl");
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("\"prior\":30", "\"prior\":31")).unwrap();

    sb.cmd().args(["audit", "verify"]).assert().code(4);
}
