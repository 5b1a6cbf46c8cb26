use anyhow::{Context, Result};
use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve `path` to an absolute form without requiring it to exist.
///
/// Components are canonicalized (following symlinks) while they exist on
/// disk; the remainder is appended lexically.
pub fn resolve_lenient(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .context("read current directory")?
            .join(path)
    };

    let mut resolved = PathBuf::new();
    let mut on_disk = true;
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir => {}
            Component::Normal(name) => {
                resolved.push(name);
                if on_disk && resolved.exists() {
                    resolved = resolved
                        .canonicalize()
                        .with_context(|| format!("resolve {}", resolved.display()))?;
                } else {
                    on_disk = false;
                }
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    Ok(resolved)
}

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}
