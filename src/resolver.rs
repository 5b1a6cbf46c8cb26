//! The dependency resolver boundary.
//!
//! Resolution itself is opaque: a [`Resolver`] consumes a request and
//! reports how it terminated. The invoker builds exactly one request per run
//! and classifies the termination into a [`ResolveOutcome`].
use crate::config::ExecutionMode;
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

mod invoke;
mod process;

pub use invoke::{Resolution, ResolverInvoker};
pub use process::ProcessResolver;

/// Exit code resolvers use for unsatisfiable constraints.
pub const CONFLICT_EXIT_CODE: i32 = 2;

/// A single resolver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Caller-supplied flags, forwarded ahead of everything else.
    pub extra_args: Vec<String>,
    /// Cache directory override; set only in check mode.
    pub cache_dir: Option<PathBuf>,
    /// File the resolver writes the locked output to.
    pub output_file: PathBuf,
    /// Specification file to resolve.
    pub requirements_in: PathBuf,
    /// Environment overrides for the resolver.
    pub env: Vec<(String, String)>,
}

impl ResolveRequest {
    /// Argument vector in the order resolvers expect.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.extra_args.clone();
        if let Some(cache_dir) = &self.cache_dir {
            argv.push("--cache-dir".to_string());
            argv.push(cache_dir.display().to_string());
        }
        argv.push("--output-file".to_string());
        argv.push(self.output_file.display().to_string());
        argv.push(self.requirements_in.display().to_string());
        argv
    }
}

/// How a resolver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Terminated with an exit code.
    Exited(i32),
    /// Killed by a signal before it could report a code.
    Signaled(i32),
    /// Came back without reporting an exit code. In-process resolvers return
    /// this directly; a child process maps to it when its status carries
    /// neither a code nor a signal.
    Returned,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exited(code) => write!(f, "exit code {code}"),
            Termination::Signaled(signal) => write!(f, "signal {signal}"),
            Termination::Returned => f.write_str("a return without exiting"),
        }
    }
}

/// Classified result of the one resolver invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ResolveOutcome {
    Success,
    Conflict,
    Unexpected { code: Option<i32> },
}

impl ResolveOutcome {
    /// Map a termination to an outcome.
    ///
    /// Check runs rely on the resolver terminating with a code, so a plain
    /// return is unexpected there; update runs accept it as success.
    pub fn classify(mode: ExecutionMode, termination: Termination) -> Self {
        match termination {
            Termination::Exited(0) => ResolveOutcome::Success,
            Termination::Exited(CONFLICT_EXIT_CODE) => ResolveOutcome::Conflict,
            Termination::Exited(code) => ResolveOutcome::Unexpected { code: Some(code) },
            Termination::Signaled(_) => ResolveOutcome::Unexpected { code: None },
            Termination::Returned => match mode {
                ExecutionMode::Update => ResolveOutcome::Success,
                ExecutionMode::Check => ResolveOutcome::Unexpected { code: None },
            },
        }
    }
}

/// An opaque dependency resolver.
pub trait Resolver {
    fn resolve(&self, request: &ResolveRequest) -> Result<Termination>;
}

impl<F> Resolver for F
where
    F: Fn(&ResolveRequest) -> Result<Termination>,
{
    fn resolve(&self, request: &ResolveRequest) -> Result<Termination> {
        self(request)
    }
}
