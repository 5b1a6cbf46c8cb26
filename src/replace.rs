//! Cross-filesystem safe file replacement.
//!
//! Sandboxes often place scratch space on a tmpfs while the committed lock
//! lives on a persistent volume, where `rename` fails with `EXDEV`. Every
//! write the run performs goes through a [`FileReplacer`] that copies content
//! onto the destination instead, which also keeps a destination symlink
//! pointing at the source tree intact.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Strategy for overwriting a destination file with new content.
pub trait FileReplacer {
    /// Overwrite `dest` with the contents of `source`.
    fn replace(&self, source: &Path, dest: &Path) -> Result<()>;

    /// Overwrite `dest` with `bytes`.
    fn write(&self, dest: &Path, bytes: &[u8]) -> Result<()>;
}

/// Copies content in place; never renames.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyReplace;

impl FileReplacer for CopyReplace {
    fn replace(&self, source: &Path, dest: &Path) -> Result<()> {
        // Copying a file onto itself truncates it.
        if same_file(source, dest)? {
            return Ok(());
        }
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::copy(source, dest)
            .with_context(|| format!("copy {} to {}", source.display(), dest.display()))?;
        Ok(())
    }

    fn write(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(dest, bytes).with_context(|| format!("write {}", dest.display()))?;
        Ok(())
    }
}

/// Whether two paths name the same underlying file, not merely equal content.
///
/// A missing path is never the same file as anything.
pub fn same_file(a: &Path, b: &Path) -> Result<bool> {
    if !a.exists() || !b.exists() {
        return Ok(false);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let meta_a = fs::metadata(a).with_context(|| format!("inspect {}", a.display()))?;
        let meta_b = fs::metadata(b).with_context(|| format!("inspect {}", b.display()))?;
        Ok(meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino())
    }
    #[cfg(not(unix))]
    {
        let resolved_a = a
            .canonicalize()
            .with_context(|| format!("resolve {}", a.display()))?;
        let resolved_b = b
            .canonicalize()
            .with_context(|| format!("resolve {}", b.display()))?;
        Ok(resolved_a == resolved_b)
    }
}
