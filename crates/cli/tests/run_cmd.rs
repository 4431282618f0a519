//! CLI tests for `sdnsh run`: scripted lines, stdin, and the JSON line
//! reports.

use std::io::Write;
use std::process::{Command, Stdio};

use assert_cmd::cargo;

fn sdnsh_cmd() -> Command {
    Command::new(cargo::cargo_bin!("sdnsh"))
}

fn run_with_stdin(args: &[&str], stdin_body: &str) -> std::process::Output {
    let mut child = sdnsh_cmd()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn sdnsh");
    {
        let stdin = child.stdin.as_mut().expect("stdin handle");
        stdin.write_all(stdin_body.as_bytes()).expect("write stdin");
    }
    child.wait_with_output().expect("wait for sdnsh")
}

/// One JSON report per executed line.
fn reports(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect()
}

#[test]
fn stdin_script_configures_and_shows() {
    let script = "\
enable
configure
! a comment
switch s1
dpid 00:00:00:00:00:00:00:0A
interface eth1
speed 1G
ip address 10.0.0.1/24
end
show switch
";
    let output = run_with_stdin(&["run", "--output", "json"], script);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let reports = reports(&output.stdout);
    assert_eq!(reports.len(), 9);
    assert!(reports.iter().all(|r| r["ok"] == true));
    assert_eq!(reports[2]["prompt"], "sdnsh(config)#");
    assert_eq!(reports[7]["prompt"], "sdnsh(config-switch-interface)#");
    assert_eq!(reports[8]["prompt"], "sdnsh#");
    let shown = reports[8]["output"].as_str().expect("show output");
    assert!(
        shown.contains("1 s1 00:00:00:00:00:00:00:0a"),
        "unexpected table: {shown}"
    );
}

#[test]
fn failed_lines_are_reported_and_the_rest_still_run() {
    let output = sdnsh_cmd()
        .args(["run", "--output", "json", "-c", "enable", "-c", "bogus", "-c", "configure"])
        .output()
        .expect("run sdnsh");
    assert_eq!(output.status.code(), Some(1));

    let reports = reports(&output.stdout);
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[1]["ok"], false);
    assert_eq!(reports[1]["error"]["id"], "SDN1001");
    assert_eq!(reports[1]["error"]["message"], "No such command \"bogus\"");
    assert_eq!(reports[1]["error"]["span"]["start"], 0);
    assert_eq!(reports[1]["error"]["span"]["end"], 5);
    assert_eq!(reports[2]["ok"], true);
    assert_eq!(reports[2]["prompt"], "sdnsh#");
}

#[test]
fn errors_after_no_point_at_the_right_word() {
    let output = sdnsh_cmd()
        .args(["run", "--output", "json", "--mode", "config", "-c", "no vlan 9999"])
        .output()
        .expect("run sdnsh");
    assert_eq!(output.status.code(), Some(1));
    let reports = reports(&output.stdout);
    let error = &reports[0]["error"];
    assert_eq!(error["id"], "SDN1101");
    assert_eq!(error["message"], "Invalid vlan: 9999; not in range 1..4095");
    assert_eq!(error["span"]["start"], 8);
}

#[test]
fn store_seed_and_hostname_flags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("store.json");
    std::fs::write(
        &store,
        r#"{ "switch": { "s1": { "dpid": "00:00:00:00:00:00:00:01" } } }"#,
    )
    .expect("write store");

    let output = sdnsh_cmd()
        .args(["run", "--output", "pretty", "--hostname", "ctl", "--store"])
        .arg(&store)
        .args(["-c", "show switch s1 details"])
        .output()
        .expect("run sdnsh");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "switch s1\n  id   : s1\n  dpid : 00:00:00:00:00:00:00:01\n"
    );
}

#[test]
fn config_file_sets_features_and_initial_mode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("sdnsh.jsonc");
    std::fs::write(
        &config,
        "// lab controller\n{ \"initialMode\": \"config\", \"features\": [\"tenant-priority\"] }",
    )
    .expect("write config");

    let output = sdnsh_cmd()
        .args(["run", "--output", "json", "--config"])
        .arg(&config)
        .args(["-c", "tenant red", "-c", "priority 0x10"])
        .output()
        .expect("run sdnsh");
    assert!(output.status.success(), "stdout: {}", String::from_utf8_lossy(&output.stdout));

    // Without the feature the command does not exist.
    let output = sdnsh_cmd()
        .args(["run", "--output", "json", "--mode", "config-tenant"])
        .args(["-c", "priority 16"])
        .output()
        .expect("run sdnsh");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn extra_grammar_files_add_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let grammar = dir.path().join("extra.jsonc");
    std::fs::write(
        &grammar,
        r#"{ "commands": [
            { "name": "host", "modes": ["config*"], "commandType": "config-object",
              "objType": "host", "args": [{ "kind": "field", "field": "id", "type": "mac-address" }] }
        ] }"#,
    )
    .expect("write grammar");

    let output = sdnsh_cmd()
        .args(["run", "--output", "json", "--mode", "config", "--grammar"])
        .arg(&grammar)
        .args(["-c", "host 00:11:22:AA:BB:CC"])
        .output()
        .expect("run sdnsh");
    assert!(output.status.success(), "stdout: {}", String::from_utf8_lossy(&output.stdout));
}

#[test]
fn malformed_grammar_files_fail_to_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let grammar = dir.path().join("broken.jsonc");
    std::fs::write(&grammar, "{ \"commands\": [ }").expect("write grammar");

    let output = sdnsh_cmd()
        .args(["run", "--output", "json", "--grammar"])
        .arg(&grammar)
        .args(["-c", "enable"])
        .output()
        .expect("run sdnsh");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let diagnostics: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(diagnostics[0]["id"], "SDN2108");
}
