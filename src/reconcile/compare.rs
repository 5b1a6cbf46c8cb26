//! Golden vs candidate comparison.
//!
//! Equality is exact over the line sequence: whitespace, ordering, and
//! whether a line is terminated all count. `\r\n` and `\n` terminate a line
//! equally, so a checkout with converted line endings still matches.
use anyhow::{Context, Result};
use similar::TextDiff;
use std::fs;
use std::path::Path;

const DIFF_CONTEXT_LINES: usize = 3;

/// Compare two lock files; `Some(diff)` when they differ.
pub fn compare_files(golden: &Path, candidate: &Path) -> Result<Option<String>> {
    let golden_text = fs::read_to_string(golden)
        .with_context(|| format!("read golden lock {}", golden.display()))?;
    let candidate_text = fs::read_to_string(candidate)
        .with_context(|| format!("read candidate lock {}", candidate.display()))?;
    if lines_equal(&golden_text, &candidate_text) {
        return Ok(None);
    }
    Ok(Some(unified_diff(
        &golden_text,
        &candidate_text,
        &golden.display().to_string(),
        &candidate.display().to_string(),
    )))
}

pub fn lines_equal(left: &str, right: &str) -> bool {
    logical_lines(left).eq(logical_lines(right))
}

/// Each line's content paired with whether it was terminated.
fn logical_lines(text: &str) -> impl Iterator<Item = (&str, bool)> {
    text.split_inclusive('\n')
        .map(|line| match line.strip_suffix('\n') {
            Some(body) => (body.strip_suffix('\r').unwrap_or(body), true),
            None => (line, false),
        })
}

/// Unified diff from `golden` to `candidate`.
pub fn unified_diff(
    golden: &str,
    candidate: &str,
    golden_label: &str,
    candidate_label: &str,
) -> String {
    TextDiff::from_lines(golden, candidate)
        .unified_diff()
        .context_radius(DIFF_CONTEXT_LINES)
        .header(golden_label, candidate_label)
        .to_string()
}
