//! CLI argument parsing for the lock reconciliation run.
//!
//! The positional layout mirrors what the build rule passes: the
//! specification, the committed lock, three platform overrides, and the
//! update target label.
use clap::Parser;
use std::path::PathBuf;

/// Token the build rule passes for a platform override it does not define.
pub const NONE_TOKEN: &str = "None";

/// Resolver used when neither `--resolver` nor `REQLOCK_RESOLVER` is set.
pub const DEFAULT_RESOLVER: &str = "pip-compile";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "reqlock",
    version,
    about = "Regenerate or verify a pinned lock file against its specification",
    after_help = "Mode:\n  TEST_TMPDIR set    check the committed lock file without modifying it\n  TEST_TMPDIR unset  regenerate the committed lock file\n\nExamples:\n  reqlock requirements.in requirements.txt None None None //:requirements.update\n  reqlock requirements.in requirements.txt requirements_linux.txt None None //:update -- --generate-hashes"
)]
pub struct RunArgs {
    /// Specification file listing the unpinned requirements
    #[arg(value_name = "REQUIREMENTS_IN")]
    pub requirements_in: PathBuf,

    /// Committed lock file to regenerate or verify
    #[arg(value_name = "REQUIREMENTS_TXT")]
    pub requirements_txt: PathBuf,

    /// Linux-specific golden lock file, or `None`
    #[arg(value_name = "REQUIREMENTS_LINUX", value_parser = parse_override)]
    pub requirements_linux: Override,

    /// macOS-specific golden lock file, or `None`
    #[arg(value_name = "REQUIREMENTS_DARWIN", value_parser = parse_override)]
    pub requirements_darwin: Override,

    /// Windows-specific golden lock file, or `None`
    #[arg(value_name = "REQUIREMENTS_WINDOWS", value_parser = parse_override)]
    pub requirements_windows: Override,

    /// Target label used to build the update command shown to users
    #[arg(value_name = "UPDATE_TARGET_LABEL")]
    pub update_target_label: String,

    /// Resolver command line (defaults to $REQLOCK_RESOLVER, then pip-compile)
    #[arg(long, value_name = "CMD")]
    pub resolver: Option<String>,

    /// Write a JSON run report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Extra arguments forwarded to the resolver
    #[arg(last = true, value_name = "RESOLVER_ARGS")]
    pub resolver_args: Vec<String>,
}

/// A platform override argument after the `None` token has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override(pub Option<PathBuf>);

impl Override {
    pub fn into_path(self) -> Option<PathBuf> {
        self.0
    }
}

fn parse_override(raw: &str) -> Result<Override, String> {
    if raw.is_empty() {
        return Err("override must be a path or None".to_string());
    }
    if raw == NONE_TOKEN || raw == "none" {
        return Ok(Override(None));
    }
    Ok(Override(Some(PathBuf::from(raw))))
}
