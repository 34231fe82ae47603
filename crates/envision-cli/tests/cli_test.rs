use assert_cmd::prelude::*;
use envision::{
    EnvisionConfig, EnvisionSession, MemoryPromptCache, PromptCache, QueuedGenerationService,
};
use std::fs;
use std::path::Path;
use std::process::Command;

const SUMMARY: &str = "A chatbot that triages walk-in patients";
const USE_CASES: &str = "<intended>Answer triage questions</intended><misuse>Self-diagnose</misuse>";

/// Writes a cache answering the root's use-case request.
fn write_cache(dir: &Path) -> std::path::PathBuf {
    let mut session = EnvisionSession::new(EnvisionConfig::default(), QueuedGenerationService::new());
    drop(session.start(SUMMARY).expect("start"));
    let req = session.service_mut().take_requests().remove(0);

    let mut cache = MemoryPromptCache::new();
    cache.put(req.compiled_prompt, USE_CASES.to_string());
    let path = dir.join("cache.json");
    cache.save(&path).expect("write cache");
    path
}

#[test]
fn cli_exports_cached_use_cases_as_text() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = write_cache(tmp.path());

    let exe = assert_cmd::cargo_bin!("envision-cli");
    let output = Command::new(exe)
        .args([
            "run",
            "--cache",
            cache.to_string_lossy().as_ref(),
            "--prompt",
            "Help nurses triage",
            "--use-cases-only",
            SUMMARY,
        ])
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf-8");
    assert!(stdout.starts_with("## Prompt\n\nHelp nurses triage\n\n"));
    assert!(stdout.contains("### Use Case 1: Answer triage questions"));
    assert!(stdout.contains("### Use Case 2: Self-diagnose"));
}

#[test]
fn cli_reports_cache_misses_and_still_exports() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = tmp.path().join("empty.json");
    fs::write(&cache, "{}").expect("write cache");
    let out = tmp.path().join("tree.json");

    let exe = assert_cmd::cargo_bin!("envision-cli");
    let output = Command::new(exe)
        .args([
            "--cache",
            cache.to_string_lossy().as_ref(),
            "--format",
            "json",
            "--out",
            out.to_string_lossy().as_ref(),
            SUMMARY,
        ])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("utf-8");
    assert!(stderr.contains("no cached response"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read export")).expect("json");
    assert_eq!(json["data"]["text"], SUMMARY);
}

#[test]
fn cli_reads_the_summary_from_stdin_and_renders_svg() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = write_cache(tmp.path());

    let exe = assert_cmd::cargo_bin!("envision-cli");
    let output = assert_cmd::Command::new(exe)
        .args([
            "--cache",
            cache.to_string_lossy().as_ref(),
            "--format",
            "svg",
        ])
        .write_stdin(format!("{SUMMARY}\n"))
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let svg = String::from_utf8(output.stdout).expect("utf-8");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Answer triage questions"));
    // One uncached stakeholder request per use case.
    let stderr = String::from_utf8(output.stderr).expect("utf-8");
    assert_eq!(stderr.matches("no cached response").count(), 2);
}

#[test]
fn cli_requires_a_cache() {
    let exe = assert_cmd::cargo_bin!("envision-cli");
    Command::new(exe)
        .arg("--format")
        .arg("text")
        .assert()
        .code(2);
}
