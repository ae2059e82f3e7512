use rewrite_remote::run::{RunArgs, run};

use remoting_core::descriptor::ParamValue;

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

fn args(dir: &TempDir, files: Vec<PathBuf>, write: bool) -> RunArgs {
    RunArgs {
        operation: String::from("add-property"),
        params: vec![
            (String::from("key"), ParamValue::from("color")),
            (String::from("value"), ParamValue::from("blue")),
        ],
        files,
        worker: Some(PathBuf::from(env!("CARGO_BIN_EXE_remoting-worker"))),
        socket: Some(dir.path().join("worker.sock")),
        config_dir: None,
        log_dir: None,
        write,
        verbose: false,
    }
}

/// **VALUE**: `run --write` updates files that need the property and leaves the
/// rest untouched.
#[test]
fn given_files_when_run_with_write_then_only_changed_files_rewritten() {
    // GIVEN: One file missing the property and one that has it
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("missing.properties");
    let present = dir.path().join("present.properties");
    fs::write(&missing, "size = large\n").expect("write");
    fs::write(&present, "color = red\n").expect("write");

    // WHEN: Running with --write
    let outcomes = run(&args(&dir, vec![missing.clone(), present.clone()], true)).expect("run");

    // THEN: Only the first file changed
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].changed);
    assert!(!outcomes[1].changed);
    assert_eq!(
        fs::read_to_string(&missing).expect("read"),
        "size = large\ncolor = blue\n"
    );
    assert_eq!(fs::read_to_string(&present).expect("read"), "color = red\n");
    assert!(!dir.path().join("worker.sock").exists(), "Worker not torn down");
}

#[test]
fn given_files_when_run_without_write_then_files_untouched() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("app.properties");
    fs::write(&file, "").expect("write");

    let outcomes = run(&args(&dir, vec![file.clone()], false)).expect("run");

    assert_eq!(outcomes[0].text, "color = blue\n");
    assert_eq!(fs::read_to_string(&file).expect("read"), "");
}

#[test]
fn given_missing_file_when_run_then_io_error() {
    let dir = TempDir::new().expect("tempdir");

    let result = run(&args(&dir, vec![dir.path().join("nope.txt")], false));

    assert!(matches!(
        result,
        Err(rewrite_remote::error::RewriteRemoteError::Io { .. })
    ));
}
