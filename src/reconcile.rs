//! Reconciliation controller.
//!
//! One run walks `Start -> ModeSelected -> Invoked -> [Compared] -> Done`:
//! the mode comes from the environment snapshot, the resolver runs once,
//! check runs compare the candidate against the golden lock, and update runs
//! schedule a copy-back into the live workspace before the resolver runs.
//! Finalizers run once the outcome is decided, or on the way out when the
//! invocation itself fails, in the order they were scheduled.
use crate::annotations::ProvenanceFormatter;
use crate::config::{ExecutionMode, RunConfig};
use crate::replace::{same_file, FileReplacer};
use crate::resolver::{Resolution, ResolveOutcome, Resolver, ResolverInvoker, Termination};
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

mod compare;
mod finalize;
mod report;

pub use compare::compare_files;
pub use finalize::{Finalizer, FinalizerRecord, Finalizers};
pub use report::{write_report, RunReport};

/// Controller states, recorded in the order a run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    ModeSelected,
    Invoked,
    Compared,
    Done,
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Updated,
    Verified,
    Stale,
    ResolutionConflict,
    UnexpectedFailure,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Updated | RunOutcome::Verified => 0,
            RunOutcome::Stale | RunOutcome::ResolutionConflict | RunOutcome::UnexpectedFailure => 1,
        }
    }
}

/// Everything a run decided, for reporting.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mode: ExecutionMode,
    pub outcome: RunOutcome,
    pub trail: Vec<Phase>,
    pub resolution: Resolution,
    /// Golden lock compared against; check runs that reached comparison only.
    pub golden: Option<PathBuf>,
    /// Unified diff of golden vs candidate when stale.
    pub diff: Option<String>,
    pub finalizers: Vec<FinalizerRecord>,
}

/// Drives a single reconciliation run.
pub struct Reconciler<'a> {
    config: &'a RunConfig,
    resolver: &'a dyn Resolver,
    formatter: &'a dyn ProvenanceFormatter,
    replacer: &'a dyn FileReplacer,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a RunConfig,
        resolver: &'a dyn Resolver,
        formatter: &'a dyn ProvenanceFormatter,
        replacer: &'a dyn FileReplacer,
    ) -> Self {
        Self {
            config,
            resolver,
            formatter,
            replacer,
        }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let mut trail = vec![Phase::Start];
        let mode = self.config.mode;
        enter(&mut trail, Phase::ModeSelected);
        tracing::info!(?mode, platform = %self.config.platform, "mode selected");
        match mode {
            ExecutionMode::Update => {
                println!("Updating {}", self.config.requirements_txt.display())
            }
            ExecutionMode::Check => {
                println!("Checking {}", self.config.requirements_txt.display())
            }
        }

        // Copy-back is queued ahead of the resolver and also runs on the
        // error path.
        let mut finalizers = Finalizers::default();
        if mode == ExecutionMode::Update {
            self.schedule_copy_back(&mut finalizers)?;
        }

        let invoker =
            ResolverInvoker::new(self.config, self.resolver, self.formatter, self.replacer);
        let resolution = match invoker.invoke() {
            Ok(resolution) => resolution,
            Err(err) => {
                finalizers.run(self.replacer);
                return Err(err);
            }
        };
        enter(&mut trail, Phase::Invoked);

        let mut golden = None;
        let mut diff = None;
        let outcome = match (mode, resolution.outcome) {
            (_, ResolveOutcome::Conflict) => RunOutcome::ResolutionConflict,
            (_, ResolveOutcome::Unexpected { .. }) => RunOutcome::UnexpectedFailure,
            (ExecutionMode::Update, ResolveOutcome::Success) => RunOutcome::Updated,
            (ExecutionMode::Check, ResolveOutcome::Success) => {
                let golden_path = self.config.golden.select(self.config.platform);
                let candidate = self.config.output_path();
                diff = compare_files(golden_path, candidate)?;
                golden = Some(golden_path.to_path_buf());
                enter(&mut trail, Phase::Compared);
                if diff.is_some() {
                    RunOutcome::Stale
                } else {
                    RunOutcome::Verified
                }
            }
        };

        enter(&mut trail, Phase::Done);
        tracing::info!(
            ?outcome,
            finalizers = finalizers.pending().len(),
            "run complete"
        );
        let finalizers = finalizers.run(self.replacer);
        Ok(RunSummary {
            mode,
            outcome,
            trail,
            resolution,
            golden,
            diff,
            finalizers,
        })
    }

    /// Queue a copy of the lock into the live workspace when the build
    /// system handed us a private copy rather than a link to the source tree.
    fn schedule_copy_back(&self, finalizers: &mut Finalizers) -> Result<()> {
        let Some(workspace) = &self.config.workspace_dir else {
            return Ok(());
        };
        let lock = &self.config.requirements_txt;
        let tree_copy = workspace.join(lock);
        if same_file(lock, &tree_copy)? {
            tracing::debug!(path = %lock.display(), "lock is linked into the workspace");
            return Ok(());
        }
        finalizers.push(Finalizer::CopyBack {
            source: lock.clone(),
            dest: tree_copy,
        });
        Ok(())
    }
}

fn enter(trail: &mut Vec<Phase>, phase: Phase) {
    tracing::debug!(?phase, "enter phase");
    trail.push(phase);
}

/// Write the user-facing explanation of a run to `err`.
///
/// Bare success writes nothing.
pub fn explain(summary: &RunSummary, config: &RunConfig, err: &mut dyn Write) -> Result<()> {
    match summary.outcome {
        RunOutcome::Updated | RunOutcome::Verified => {}
        RunOutcome::Stale => {
            if let Some(diff) = &summary.diff {
                write!(err, "{diff}")?;
            }
            writeln!(
                err,
                "Lock file out of date. Run '{}' to update.",
                config.update_command
            )?;
        }
        RunOutcome::ResolutionConflict => {
            writeln!(
                err,
                "Resolver exited with code 2. This means that the resolver found incompatible \
                 requirements or could not find a version that matches the install requirement \
                 in {}.",
                config.requirements_in_arg.display()
            )?;
        }
        RunOutcome::UnexpectedFailure => match summary.resolution.termination {
            Termination::Returned => {
                writeln!(
                    err,
                    "Resolver returned without exiting; it is expected to terminate with an \
                     exit code."
                )?;
            }
            termination => {
                writeln!(err, "Resolver unexpectedly exited with {termination}.")?;
            }
        },
    }
    for record in &summary.finalizers {
        if let Some(error) = &record.error {
            writeln!(err, "warning: {} failed: {error}", record.action)?;
        }
    }
    Ok(())
}
