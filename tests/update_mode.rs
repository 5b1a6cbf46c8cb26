//! Update-mode runs against a fake resolver.
#![cfg(unix)]

mod common;

use common::{expected_lock, run, stderr, stdout, Sandbox, UPDATE_LABEL};
use std::fs;
use std::process::Command;

#[test]
fn regenerates_the_committed_lock() {
    let sandbox = Sandbox::new(&["pkg==2.0", "other==3.1"], &expected_lock(&["pkg==1.0"]));

    let output = run(sandbox.update());

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Updating requirements.txt"));
    assert_eq!(
        sandbox.read("requirements.txt"),
        expected_lock(&["pkg==2.0", "other==3.1"])
    );
}

#[test]
fn copies_the_lock_back_into_the_workspace() {
    let sandbox = Sandbox::new(&["pkg==2.0"], &expected_lock(&["pkg==1.0"]));
    let workspace = sandbox.path().join("workspace");
    fs::create_dir_all(&workspace).expect("create workspace");
    fs::write(workspace.join("requirements.txt"), expected_lock(&["pkg==1.0"]))
        .expect("write workspace lock");
    let mut cmd = sandbox.update();
    cmd.env("BUILD_WORKSPACE_DIRECTORY", &workspace);

    let output = run(cmd);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let updated = expected_lock(&["pkg==2.0"]);
    assert_eq!(sandbox.read("requirements.txt"), updated);
    assert_eq!(
        fs::read_to_string(workspace.join("requirements.txt")).expect("read workspace lock"),
        updated
    );
}

#[test]
fn failed_copy_back_warns_without_changing_the_outcome() {
    let sandbox = Sandbox::new(&["pkg==2.0"], &expected_lock(&["pkg==1.0"]));
    // A regular file where the workspace directory should be.
    let workspace = sandbox.path().join("not-a-dir");
    fs::write(&workspace, "").expect("write blocker");
    let mut cmd = sandbox.update();
    cmd.env("BUILD_WORKSPACE_DIRECTORY", &workspace);

    let output = run(cmd);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("warning: copy requirements.txt to"));
    assert_eq!(sandbox.read("requirements.txt"), expected_lock(&["pkg==2.0"]));
}

#[test]
fn copy_back_still_runs_when_the_output_cannot_be_read() {
    let sandbox = Sandbox::new(&["pkg==2.0"], &expected_lock(&["pkg==1.0"]));
    let workspace = sandbox.path().join("workspace");
    fs::create_dir_all(&workspace).expect("create workspace");
    fs::write(workspace.join("requirements.txt"), expected_lock(&["pkg==1.0"]))
        .expect("write workspace lock");
    let mut cmd = sandbox.update();
    cmd.env("BUILD_WORKSPACE_DIRECTORY", &workspace).env("FAKE_RESOLVER_RAW", "1");

    let output = run(cmd);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error:"), "stderr: {}", stderr(&output));
    let written = fs::read(sandbox.path().join("requirements.txt")).expect("read lock");
    assert_eq!(written, b"\xff\xfe\n");
    assert_eq!(
        fs::read(workspace.join("requirements.txt")).expect("read workspace lock"),
        written
    );
}

#[test]
fn lock_created_inside_the_workspace_is_not_truncated() {
    let sandbox = Sandbox::new(&["pkg==2.0"], "");
    fs::remove_file(sandbox.path().join("requirements.txt")).expect("remove lock");
    let mut cmd = sandbox.update();
    cmd.env("BUILD_WORKSPACE_DIRECTORY", sandbox.path());

    let output = run(cmd);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(sandbox.read("requirements.txt"), expected_lock(&["pkg==2.0"]));
}

#[test]
fn conflict_leaves_the_run_failed() {
    let lock = expected_lock(&["pkg==1.0"]);
    let sandbox = Sandbox::new(&["pkg==2.0"], &lock);
    let mut cmd = sandbox.update();
    cmd.env("FAKE_RESOLVER_EXIT", "2");

    let output = run(cmd);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Resolver exited with code 2"));
    assert_eq!(sandbox.read("requirements.txt"), lock);
}

#[test]
fn update_runs_pass_no_cache_dir() {
    let sandbox = Sandbox::new(&["pkg==1.0"], "");
    let args_log = sandbox.path().join("args.log");
    let mut cmd = sandbox.update();
    cmd.env("FAKE_RESOLVER_ARGS_LOG", &args_log);

    let output = run(cmd);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let args = fs::read_to_string(&args_log).expect("read args log");
    assert_eq!(args.trim_end(), "--output-file requirements.txt requirements.in");
}

#[test]
fn missing_resolver_is_an_error() {
    let sandbox = Sandbox::new(&["pkg==1.0"], "");
    let output = Command::new(env!("CARGO_BIN_EXE_reqlock"))
        .current_dir(sandbox.path())
        .env_remove("TEST_TMPDIR")
        .env("REQLOCK_RESOLVER", "definitely-not-a-resolver-xyz")
        .args(["requirements.in", "requirements.txt", "None", "None", "None"])
        .arg(UPDATE_LABEL)
        .output()
        .expect("run reqlock");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("definitely-not-a-resolver-xyz"));
}
