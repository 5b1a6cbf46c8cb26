//! Golden lock file selection.
//!
//! A check run compares the candidate against exactly one committed file:
//! the platform override for the host when one was supplied, otherwise the
//! platform-independent lock file.
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Host platforms that can carry their own golden lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linux,
    #[serde(rename = "macos")]
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// Platform the binary was built for.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The platform-independent lock file plus any per-platform overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoldenFiles {
    pub base: PathBuf,
    pub linux: Option<PathBuf>,
    pub macos: Option<PathBuf>,
    pub windows: Option<PathBuf>,
}

impl GoldenFiles {
    pub fn new(base: PathBuf) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// Pick the golden file for `platform`; first match wins.
    pub fn select(&self, platform: Platform) -> &Path {
        let chosen = match platform {
            Platform::Linux => self.linux.as_deref(),
            Platform::MacOs => self.macos.as_deref(),
            Platform::Windows => self.windows.as_deref(),
            Platform::Other => None,
        };
        let chosen = chosen.unwrap_or(self.base.as_path());
        tracing::debug!(
            platform = %platform,
            golden = %chosen.display(),
            "selected golden lock file"
        );
        chosen
    }
}
