//! Ordered actions run once the outcome of a run is known.
use crate::replace::FileReplacer;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalizer {
    /// Propagate the updated lock back into the live source tree.
    CopyBack { source: PathBuf, dest: PathBuf },
}

impl fmt::Display for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finalizer::CopyBack { source, dest } => {
                write!(f, "copy {} to {}", source.display(), dest.display())
            }
        }
    }
}

/// What happened to one finalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizerRecord {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Finalizers {
    queue: Vec<Finalizer>,
}

impl Finalizers {
    pub fn push(&mut self, finalizer: Finalizer) {
        tracing::debug!(%finalizer, "scheduled finalizer");
        self.queue.push(finalizer);
    }

    pub fn pending(&self) -> &[Finalizer] {
        &self.queue
    }

    /// Run every finalizer in order. Failures are recorded, not propagated,
    /// so one failing action never skips the ones after it.
    pub fn run(self, replacer: &dyn FileReplacer) -> Vec<FinalizerRecord> {
        self.queue
            .into_iter()
            .map(|finalizer| {
                let result = match &finalizer {
                    Finalizer::CopyBack { source, dest } => replacer.replace(source, dest),
                };
                let error = match result {
                    Ok(()) => None,
                    Err(err) => {
                        let message = format!("{err:#}");
                        tracing::warn!(%finalizer, error = %message, "finalizer failed");
                        Some(message)
                    }
                };
                FinalizerRecord {
                    action: finalizer.to_string(),
                    error,
                }
            })
            .collect()
    }
}
