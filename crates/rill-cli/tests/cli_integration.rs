//! Integration tests for the `rill` binary
//!
//! Each test runs the built executable against files in a temp directory.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn rill(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rill"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RILLLIB")
        .env_remove("RILL_LOG")
        .output()
        .expect("failed to launch rill")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ────────────────────────────────────────────────────────────────────────────
// run
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_run_source_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hello.rill"), "puts(\"hello from rill\");").unwrap();

    let output = rill(dir.path(), &["run", "hello.rill"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "hello from rill\n");
}

#[test]
fn test_build_then_run_bytecode() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("sum.rill"),
        "fn add(a, b) { a + b }\nputs(add(2, 3));",
    )
    .unwrap();

    let build = rill(dir.path(), &["build", "sum.rill"]);
    assert!(build.status.success(), "stderr: {}", stderr(&build));
    assert!(stdout(&build).contains("Compiled sum.rill -> sum.rbc"));
    assert!(dir.path().join("sum.rbc").is_file());

    let run = rill(dir.path(), &["run", "sum.rbc"]);
    assert!(run.status.success(), "stderr: {}", stderr(&run));
    assert_eq!(stdout(&run), "5\n");
}

#[test]
fn test_require_through_include_flag() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib");
    fs::create_dir(&lib).unwrap();
    fs::write(lib.join("greet.rill"), "fn greet(n) { \"hi \" + n }").unwrap();
    fs::write(
        dir.path().join("main.rill"),
        "require(\"greet\"); puts(greet(\"there\")); puts(require(\"greet\"));",
    )
    .unwrap();

    let output = rill(dir.path(), &["run", "-I", "lib", "main.rill"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "hi there\nfalse\n");
}

#[test]
fn test_syntax_error_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.rill"), "let = 1;").unwrap();

    let output = rill(dir.path(), &["run", "bad.rill"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("error: can't load file -- bad.rill"));
}

#[test]
fn test_uncaught_exception_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("boom.rill"), "raise \"boom\";").unwrap();

    let output = rill(dir.path(), &["run", "boom.rill"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("boom (RuntimeError)"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = rill(dir.path(), &["run", "nope.rill"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("File not found: nope.rill"));
}

// ────────────────────────────────────────────────────────────────────────────
// eval
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_eval_print() {
    let dir = tempfile::tempdir().unwrap();
    let output = rill(dir.path(), &["eval", "--print", "6 * 7"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "42\n");
}

#[test]
fn test_eval_leaves_no_scratch_files() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    fs::create_dir(&scratch).unwrap();

    let output = rill(
        dir.path(),
        &["eval", "--scratch-dir", "scratch", "__load_source(\"puts(1)\")"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "1\n");
    assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
}

#[test]
fn test_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let vendor = dir.path().join("vendor");
    fs::create_dir(&vendor).unwrap();
    fs::write(vendor.join("v.rill"), "puts(\"vendored\");").unwrap();
    fs::write(dir.path().join("rill.toml"), "load_path = [\"vendor\"]\n").unwrap();

    let output = rill(dir.path(), &["eval", "--config", "rill.toml", "require(\"v\")"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "vendored\n");
}
