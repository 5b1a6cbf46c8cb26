//! Run configuration.
//!
//! The environment is read exactly once into [`RunEnv`] and combined with the
//! CLI arguments into a [`RunConfig`] that every component receives. Nothing
//! downstream reads or mutates the process environment.
use crate::cli::{RunArgs, DEFAULT_RESOLVER};
use crate::golden::{GoldenFiles, Platform};
use crate::util::resolve_lenient;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Presence selects check mode; also the scratch and cache directory.
pub const TEST_TMPDIR_VAR: &str = "TEST_TMPDIR";
/// Live source tree root exposed by `bazel run`.
pub const WORKSPACE_DIR_VAR: &str = "BUILD_WORKSPACE_DIRECTORY";
/// Command the resolver embeds in the lock header.
pub const COMPILE_COMMAND_VAR: &str = "CUSTOM_COMPILE_COMMAND";
/// Package index configuration file read by the resolver.
pub const INDEX_CONFIG_VAR: &str = "PIP_CONFIG_FILE";
/// Resolver command line used when `--resolver` is absent.
pub const RESOLVER_VAR: &str = "REQLOCK_RESOLVER";

/// Locale forced onto the resolver so its argument parser never sees ASCII.
pub const UTF8_LOCALE: &str = "C.UTF-8";

#[cfg(windows)]
const NULL_DEVICE: &str = "nul";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

/// Snapshot of the environment variables a run consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunEnv {
    pub test_tmpdir: Option<PathBuf>,
    pub workspace_dir: Option<PathBuf>,
    pub compile_command: Option<String>,
    pub index_config: Option<String>,
    pub resolver: Option<String>,
}

impl RunEnv {
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    /// Build from explicit key/value pairs; empty values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let vars: BTreeMap<OsString, OsString> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .filter(|(_, value)| !value.is_empty())
            .collect();
        let text = |key: &str| {
            vars.get(&OsString::from(key))
                .map(|value| value.to_string_lossy().into_owned())
        };
        let path = |key: &str| vars.get(&OsString::from(key)).map(PathBuf::from);
        Self {
            test_tmpdir: path(TEST_TMPDIR_VAR),
            workspace_dir: path(WORKSPACE_DIR_VAR),
            compile_command: text(COMPILE_COMMAND_VAR),
            index_config: text(INDEX_CONFIG_VAR),
            resolver: text(RESOLVER_VAR),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        if self.test_tmpdir.is_some() {
            ExecutionMode::Check
        } else {
            ExecutionMode::Update
        }
    }
}

/// Whether the run regenerates the committed lock or only verifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Update,
    Check,
}

/// Check-mode scratch locations inside the sandbox temp dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scratch {
    /// Resolver cache directory.
    pub cache_dir: PathBuf,
    /// Where the candidate lock is written instead of the committed file.
    pub output: PathBuf,
}

/// Everything a run needs, resolved once at start.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: ExecutionMode,
    pub platform: Platform,
    /// Specification path as handed to the resolver.
    pub requirements_in: PathBuf,
    /// Specification path as given on the command line.
    pub requirements_in_arg: PathBuf,
    /// Committed lock file.
    pub requirements_txt: PathBuf,
    pub golden: GoldenFiles,
    pub scratch: Option<Scratch>,
    pub workspace_dir: Option<PathBuf>,
    pub update_command: String,
    pub index_config: String,
    pub resolver_command: String,
    pub resolver_args: Vec<String>,
    pub report: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_args(args: RunArgs, env: &RunEnv) -> Result<Self> {
        let mode = env.mode();
        let requirements_in = spec_path_for_resolver(&args.requirements_in)?;
        let scratch = match mode {
            ExecutionMode::Check => {
                let tmpdir = env
                    .test_tmpdir
                    .as_deref()
                    .ok_or_else(|| anyhow!("{TEST_TMPDIR_VAR} is required in check mode"))?;
                Some(scratch_for(tmpdir, &args.requirements_txt)?)
            }
            ExecutionMode::Update => None,
        };
        let mut golden = GoldenFiles::new(args.requirements_txt.clone());
        golden.linux = args.requirements_linux.into_path();
        golden.macos = args.requirements_darwin.into_path();
        golden.windows = args.requirements_windows.into_path();
        let resolver_command = args
            .resolver
            .or_else(|| env.resolver.clone())
            .unwrap_or_else(|| DEFAULT_RESOLVER.to_string());

        Ok(Self {
            mode,
            platform: Platform::current(),
            requirements_in,
            requirements_in_arg: args.requirements_in,
            requirements_txt: args.requirements_txt,
            golden,
            scratch,
            workspace_dir: env.workspace_dir.clone(),
            update_command: update_command(env, &args.update_target_label),
            index_config: env
                .index_config
                .clone()
                .unwrap_or_else(|| NULL_DEVICE.to_string()),
            resolver_command,
            resolver_args: args.resolver_args,
            report: args.report,
        })
    }

    /// Path the resolver writes its candidate lock to.
    pub fn output_path(&self) -> &Path {
        match &self.scratch {
            Some(scratch) => &scratch.output,
            None => &self.requirements_txt,
        }
    }

    /// Environment overrides applied to the resolver child process.
    pub fn resolver_env(&self) -> Vec<(String, String)> {
        vec![
            ("LC_ALL".to_string(), UTF8_LOCALE.to_string()),
            ("LANG".to_string(), UTF8_LOCALE.to_string()),
            (COMPILE_COMMAND_VAR.to_string(), self.update_command.clone()),
            (INDEX_CONFIG_VAR.to_string(), self.index_config.clone()),
        ]
    }
}

/// Caller-supplied update command, else one derived from the target label.
pub fn update_command(env: &RunEnv, target_label: &str) -> String {
    env.compile_command
        .clone()
        .unwrap_or_else(|| format!("bazel run {target_label}"))
}

/// Keep the specification path as given when it exists; otherwise hand the
/// resolver its resolved absolute form (generated files live outside the cwd).
pub fn spec_path_for_resolver(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    resolve_lenient(path)
}

fn scratch_for(tmpdir: &Path, requirements_txt: &Path) -> Result<Scratch> {
    let file_name = requirements_txt
        .file_name()
        .ok_or_else(|| anyhow!("lock path {} has no file name", requirements_txt.display()))?;
    let mut output_name = file_name.to_os_string();
    output_name.push(".out");
    Ok(Scratch {
        cache_dir: tmpdir.to_path_buf(),
        output: tmpdir.join(output_name),
    })
}
