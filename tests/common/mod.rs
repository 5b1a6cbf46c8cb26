//! Shared test infrastructure for integration tests.
//!
//! Each test gets a sandbox directory holding a spec, a committed lock, and a
//! fake resolver script that writes a deterministic lock from the spec.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Label passed as the update target in every test run.
pub const UPDATE_LABEL: &str = "//:requirements.update";

/// Variables the binary reads; cleared so the host environment never leaks in.
const RUN_VARS: &[&str] = &[
    "TEST_TMPDIR",
    "BUILD_WORKSPACE_DIRECTORY",
    "CUSTOM_COMPILE_COMMAND",
    "PIP_CONFIG_FILE",
    "REQLOCK_RESOLVER",
    "REQLOCK_LOG",
];

/// Writes one pin per spec line, each annotated with a Windows-style source
/// path. `FAKE_RESOLVER_EXIT` short-circuits with that exit code, and
/// `FAKE_RESOLVER_RAW` writes bytes that are not UTF-8 instead of a lock.
const FAKE_RESOLVER: &str = r##"#!/bin/sh
if [ -n "$FAKE_RESOLVER_ARGS_LOG" ]; then
  echo "$@" > "$FAKE_RESOLVER_ARGS_LOG"
fi
if [ -n "$FAKE_RESOLVER_ENV_LOG" ]; then
  env > "$FAKE_RESOLVER_ENV_LOG"
fi
if [ -n "$FAKE_RESOLVER_EXIT" ] && [ "$FAKE_RESOLVER_EXIT" != "0" ]; then
  exit "$FAKE_RESOLVER_EXIT"
fi
out=""
spec=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-file) out="$2"; shift 2 ;;
    --cache-dir) shift 2 ;;
    *) spec="$1"; shift ;;
  esac
done
if [ -n "$FAKE_RESOLVER_RAW" ]; then
  printf '\377\376\n' > "$out"
  exit 0
fi
{
  echo "#"
  echo "#    $CUSTOM_COMPILE_COMMAND"
  echo "#"
  grep -v '^#' "$spec" | while IFS= read -r line; do
    [ -z "$line" ] && continue
    echo "$line"
    printf '    # via -r deps\\requirements.in\n'
  done
} > "$out"
"##;

/// Lock text the fake resolver produces for `pins` once annotations are
/// normalized.
pub fn expected_lock(pins: &[&str]) -> String {
    let mut text = format!("#\n#    bazel run {UPDATE_LABEL}\n#\n");
    for pin in pins {
        text.push_str(pin);
        text.push_str("\n    # via -r deps/requirements.in\n");
    }
    text
}

pub struct Sandbox {
    pub dir: TempDir,
    pub resolver: PathBuf,
}

impl Sandbox {
    /// Sandbox whose spec lists `spec_pins` and whose committed lock is `lock`.
    pub fn new(spec_pins: &[&str], lock: &str) -> Self {
        let dir = tempfile::tempdir().expect("create sandbox");
        let mut spec = String::from("# direct requirements\n");
        for pin in spec_pins {
            spec.push_str(pin);
            spec.push('\n');
        }
        fs::write(dir.path().join("requirements.in"), spec).expect("write spec");
        fs::write(dir.path().join("requirements.txt"), lock).expect("write lock");

        let resolver = dir.path().join("fake-resolver.sh");
        fs::write(&resolver, FAKE_RESOLVER).expect("write fake resolver");
        fs::set_permissions(&resolver, fs::Permissions::from_mode(0o755))
            .expect("chmod fake resolver");

        Self { dir, resolver }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).expect("read sandbox file")
    }

    /// Scratch directory used as `TEST_TMPDIR` for check runs.
    pub fn test_tmpdir(&self) -> PathBuf {
        let tmp = self.path().join("test_tmp");
        fs::create_dir_all(&tmp).expect("create test tmpdir");
        tmp
    }

    /// Command running the binary with the standard positional layout.
    pub fn command(&self, overrides: [&str; 3]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_reqlock"));
        cmd.current_dir(self.path());
        for var in RUN_VARS {
            cmd.env_remove(var);
        }
        cmd.args(["requirements.in", "requirements.txt"])
            .args(overrides)
            .arg(UPDATE_LABEL)
            .arg("--resolver")
            .arg(&self.resolver);
        cmd
    }

    /// Check-mode command with no platform overrides.
    pub fn check(&self) -> Command {
        let mut cmd = self.command(["None", "None", "None"]);
        cmd.env("TEST_TMPDIR", self.test_tmpdir());
        cmd
    }

    /// Update-mode command with no platform overrides.
    pub fn update(&self) -> Command {
        self.command(["None", "None", "None"])
    }
}

pub fn run(mut cmd: Command) -> Output {
    cmd.output().expect("run reqlock")
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
