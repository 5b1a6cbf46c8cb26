//! Builds and runs the single resolver invocation for a run.
use super::{ResolveOutcome, ResolveRequest, Resolver, Termination};
use crate::annotations::{self, ProvenanceFormatter};
use crate::config::RunConfig;
use crate::replace::FileReplacer;
use anyhow::{Context, Result};
use std::fs;

/// Raw termination of the resolver alongside its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub termination: Termination,
    pub outcome: ResolveOutcome,
}

/// Drives one resolver run with injected formatting and replace strategies.
pub struct ResolverInvoker<'a> {
    config: &'a RunConfig,
    resolver: &'a dyn Resolver,
    formatter: &'a dyn ProvenanceFormatter,
    replacer: &'a dyn FileReplacer,
}

impl<'a> ResolverInvoker<'a> {
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

    /// The request this run hands to the resolver.
    pub fn request(&self) -> ResolveRequest {
        ResolveRequest {
            extra_args: self.config.resolver_args.clone(),
            cache_dir: self
                .config
                .scratch
                .as_ref()
                .map(|scratch| scratch.cache_dir.clone()),
            output_file: self.config.output_path().to_path_buf(),
            requirements_in: self.config.requirements_in.clone(),
            env: self.config.resolver_env(),
        }
    }

    /// Run the resolver once and classify how it ended.
    ///
    /// In check mode the scratch output is first seeded from the committed
    /// lock so the resolver has a prior state to diff against. On success the
    /// written output has its provenance annotations re-rendered.
    pub fn invoke(&self) -> Result<Resolution> {
        if let Some(scratch) = &self.config.scratch {
            self.replacer
                .replace(&self.config.requirements_txt, &scratch.output)
                .context("seed scratch lock from committed file")?;
        }
        let request = self.request();
        let termination = self.resolver.resolve(&request)?;
        let outcome = ResolveOutcome::classify(self.config.mode, termination);
        tracing::debug!(?termination, ?outcome, "classified resolver termination");
        if outcome == ResolveOutcome::Success {
            self.canonicalize_output()?;
        }
        Ok(Resolution {
            termination,
            outcome,
        })
    }

    fn canonicalize_output(&self) -> Result<()> {
        let output = self.config.output_path();
        let text = fs::read_to_string(output)
            .with_context(|| format!("read resolver output {}", output.display()))?;
        let canonical = annotations::reformat(&text, self.formatter);
        if canonical != text {
            tracing::debug!(path = %output.display(), "normalized provenance annotations");
            self.replacer.write(output, canonical.as_bytes())?;
        }
        Ok(())
    }
}
