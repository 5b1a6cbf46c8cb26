//! Resolver run as a child process.
use super::{ResolveRequest, Resolver, Termination};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::Instant;

/// A resolver command line such as `pip-compile` or `uv pip compile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResolver {
    program: PathBuf,
    base_args: Vec<String>,
}

impl ProcessResolver {
    /// Parse `command` with shell quoting rules and locate the program on `PATH`.
    pub fn from_command(command: &str) -> Result<Self> {
        let argv = shell_words::split(command)
            .with_context(|| format!("parse resolver command: {command}"))?;
        let (program, base_args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("resolver command is empty"))?;
        let program = which::which(program)
            .with_context(|| format!("resolver {program} not found on PATH"))?;
        Ok(Self {
            program,
            base_args: base_args.to_vec(),
        })
    }
}

impl Resolver for ProcessResolver {
    fn resolve(&self, request: &ResolveRequest) -> Result<Termination> {
        let argv = request.argv();
        tracing::info!(
            program = %self.program.display(),
            args = ?argv,
            "invoking resolver"
        );
        let start = Instant::now();
        let status = Command::new(&self.program)
            .args(&self.base_args)
            .args(&argv)
            .envs(request.env.iter().map(|(key, value)| (key, value)))
            .status()
            .with_context(|| format!("run resolver {}", self.program.display()))?;
        let termination = termination_from_status(status);
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            %termination,
            "resolver finished"
        );
        Ok(termination)
    }
}

fn termination_from_status(status: ExitStatus) -> Termination {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;
    termination_from_parts(status.code(), signal)
}

/// A status carrying neither a code nor a signal never terminated with a
/// code, which is what [`Termination::Returned`] records.
fn termination_from_parts(code: Option<i32>, signal: Option<i32>) -> Termination {
    match (code, signal) {
        (Some(code), _) => Termination::Exited(code),
        (None, Some(signal)) => Termination::Signaled(signal),
        (None, None) => Termination::Returned,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("resolver.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        let mut perms = fs::metadata(&path).expect("script metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod script");
        path
    }

    fn request(dir: &Path) -> ResolveRequest {
        ResolveRequest {
            extra_args: Vec::new(),
            cache_dir: None,
            output_file: dir.join("out.txt"),
            requirements_in: dir.join("requirements.in"),
            env: vec![("LC_ALL".to_string(), "C.UTF-8".to_string())],
        }
    }

    #[test]
    fn reports_exit_code_and_passes_env() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = write_script(
            dir.path(),
            "while [ $# -gt 0 ]; do\n  if [ \"$1\" = --output-file ]; then out=\"$2\"; fi\n  shift\ndone\nprintf '%s\\n' \"$LC_ALL\" > \"$out\"\nexit 2",
        );
        let resolver =
            ProcessResolver::from_command(&script.display().to_string()).expect("resolver");
        let termination = resolver.resolve(&request(dir.path())).expect("resolve");
        assert_eq!(termination, Termination::Exited(2));
        assert_eq!(
            fs::read_to_string(dir.path().join("out.txt")).expect("read out"),
            "C.UTF-8\n"
        );
    }

    #[test]
    fn killed_resolver_reports_signal() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = write_script(dir.path(), "kill -9 $$");
        let resolver =
            ProcessResolver::from_command(&script.display().to_string()).expect("resolver");
        let termination = resolver.resolve(&request(dir.path())).expect("resolve");
        assert_eq!(termination, Termination::Signaled(9));
    }

    #[test]
    fn status_without_code_or_signal_is_a_plain_return() {
        assert_eq!(termination_from_parts(Some(0), None), Termination::Exited(0));
        assert_eq!(termination_from_parts(None, Some(15)), Termination::Signaled(15));
        assert_eq!(termination_from_parts(None, None), Termination::Returned);
    }

    #[test]
    fn missing_program_is_an_error() {
        let err = ProcessResolver::from_command("reqlock-no-such-resolver --flag")
            .expect_err("missing program");
        assert!(err.to_string().contains("reqlock-no-such-resolver"));
    }

    #[test]
    fn empty_command_is_an_error() {
        assert!(ProcessResolver::from_command("   ").is_err());
    }
}
