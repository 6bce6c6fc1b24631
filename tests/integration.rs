use std::path::Path;
use std::process::{Command, Output};

fn docdrift_cmd(fixture: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_docdrift"));
    cmd.current_dir(Path::new("tests/fixtures").join(fixture));
    cmd.env_remove("DOCDRIFT_LOG");
    return cmd;
}

fn check_json(fixture: &str) -> (Output, serde_json::Value) {
    let output = docdrift_cmd(fixture).args(["check", "--format", "json"]).output().unwrap();
    let value = serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    });
    return (output, value);
}

fn rules_of(report: &serde_json::Value) -> Vec<String> {
    return report["findings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| return f["rule"].as_str().unwrap().to_string())
        .collect();
}

#[test]
fn consistent_site_passes_with_no_findings() {
    let (output, report) = check_json("basic");
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(report["status"], "success");
    assert_eq!(report["findings"].as_array().unwrap().len(), 0);
    assert_eq!(report["counts"]["error"], 0);
}

#[test]
fn missing_anchor_fails_with_one_link_error() {
    let (output, report) = check_json("broken_anchor");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(report["status"], "failure");
    assert_eq!(report["counts"]["error"], 1);

    let findings = report["findings"].as_array().unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["category"], "link");
    assert_eq!(findings[0]["rule"], "link-missing-anchor");
    assert_eq!(findings[0]["location"]["slug"], "api/overview");
}

#[test]
fn text_report_is_grouped_markdown() {
    let output = docdrift_cmd("broken_anchor").arg("check").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.starts_with("# docdrift: failure"), "{text}");
    assert!(text.contains("## error (1)"));
    assert!(text.contains("### link"));
    assert!(text.contains("[link-missing-anchor]"));
}

#[test]
fn documented_requests_are_checked_against_contract() {
    let (output, report) = check_json("drift");
    assert_eq!(output.status.code(), Some(1));

    let rules = rules_of(&report);
    assert_eq!(rules, vec!["drift-unknown-endpoint", "drift-unknown-parameter"], "{report:#}");

    let findings = report["findings"].as_array().unwrap();
    assert_eq!(findings[0]["severity"], "error");
    assert_eq!(findings[0]["category"], "contract-drift");
    assert_eq!(findings[0]["location"]["slug"], "api/chat");
    assert!(findings[0]["message"].as_str().unwrap().contains("/v1/fake-endpoint"));
    assert_eq!(findings[1]["severity"], "warning");
    assert!(findings[1]["message"].as_str().unwrap().contains("`api_key`"));
}

#[test]
fn sidebar_and_orphans_are_reported() {
    let (output, report) = check_json("navigation");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(rules_of(&report), vec!["sidebar-missing-page", "orphan-page"]);
    assert_eq!(report["counts"]["error"], 1);
    assert_eq!(report["counts"]["warning"], 1);
}

#[test]
fn baseline_suppresses_known_findings() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Path::new("tests/fixtures/navigation");
    std::fs::create_dir_all(dir.path().join("docs/orphan")).unwrap();
    for file in [".docdrift.toml", "docs/index.md", "docs/orphan/page.md"] {
        std::fs::copy(fixture.join(file), dir.path().join(file)).unwrap();
    }
    let root = dir.path().to_str().unwrap();

    let baseline = docdrift_cmd("navigation").args(["--root", root, "baseline"]).output().unwrap();
    assert!(baseline.status.success(), "baseline failed: {}", String::from_utf8_lossy(&baseline.stderr));
    assert!(dir.path().join(".docdrift.baseline").exists(), "baseline not written");

    let check = docdrift_cmd("navigation").args(["--root", root, "check", "--format", "json"]).output().unwrap();
    assert_eq!(check.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&check.stdout).unwrap();
    assert_eq!(report["status"], "success");
    assert_eq!(report["suppressed"], 2);

    let unfiltered = docdrift_cmd("navigation").args(["--root", root, "check", "--no-baseline"]).output().unwrap();
    assert_eq!(unfiltered.status.code(), Some(1));
}

#[test]
fn corrupt_baseline_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".docdrift.baseline"), "entries = 3\n").unwrap();
    let root = dir.path().to_str().unwrap();

    let output = docdrift_cmd("basic").args(["--root", root, "check"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("# Error"));
}

#[test]
fn malformed_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".docdrift.toml"), "docs_dir = [\n").unwrap();
    let root = dir.path().to_str().unwrap();

    let output = docdrift_cmd("basic").args(["--root", root, "check"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("# Error: Invalid TOML"));
    assert!(output.stdout.is_empty());
}

#[test]
fn anchors_lists_heading_ids() {
    let output = docdrift_cmd("basic").args(["anchors", "api/models"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("api/models#chat-models"));

    let missing = docdrift_cmd("basic").args(["anchors", "models"]).output().unwrap();
    assert_eq!(missing.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("Did you mean `api/models`?"));
}

#[test]
fn endpoints_lists_contract() {
    let output = docdrift_cmd("drift").args(["endpoints", "--json"]).output().unwrap();
    assert!(output.status.success());
    let endpoints: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(endpoints[0]["method"], "POST");
    assert_eq!(endpoints[0]["path"], "/chat/completions");
    assert_eq!(endpoints[0]["status"], "200");
    assert_eq!(endpoints[0]["parameters"].as_array().unwrap().len(), 3);

    let without = docdrift_cmd("navigation").arg("endpoints").output().unwrap();
    assert_eq!(without.status.code(), Some(2));
}

#[test]
fn rules_catalog_covers_every_rule() {
    let output = docdrift_cmd("basic").args(["rules", "--json"]).output().unwrap();
    assert!(output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["rules"].as_array().unwrap().len(), 21);
    assert_eq!(doc["contract"].as_str().map(|c| return c.ends_with("openapi.yaml")), Some(true));
}
