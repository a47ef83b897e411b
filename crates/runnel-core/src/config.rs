//! Pipeline options that translation and execution crates can serialize/deserialize.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Which engine a pipeline is handed to after translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    /// In-process batch engine from `runnel-exec`.
    #[default]
    Local,
}

impl FromStr for RunnerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "direct" => Ok(RunnerKind::Local),
            other => Err(Error::Config(format!("unknown runner '{other}'"))),
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerKind::Local => f.write_str("local"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Job name stamped into logs and manifests.
    pub job_name: String,

    pub runner: RunnerKind,

    /// A one-input flatten reuses its input's physical node instead of
    /// emitting a pass-through union.
    pub alias_single_input_flatten: bool,

    /// `create` checks every literal against the declared coder.
    pub validate_create_values: bool,

    /// Upper bound on elements in any materialized batch; the local engine
    /// fails the run rather than exceed it.
    pub max_batch_rows: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            job_name: "runnel-job".to_string(),
            runner: RunnerKind::Local,
            alias_single_input_flatten: true,
            validate_create_values: true,
            max_batch_rows: 1_000_000,
        }
    }
}

impl PipelineOptions {
    /// Create options from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RUNNEL_JOB_NAME`: job name
    /// - `RUNNEL_RUNNER`: runner kind (`local`)
    /// - `RUNNEL_ALIAS_SINGLE_INPUT_FLATTEN`: `true`/`false`
    /// - `RUNNEL_VALIDATE_CREATE_VALUES`: `true`/`false`
    /// - `RUNNEL_MAX_BATCH_ROWS`: element cap per batch
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipelineOptions::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self::default();

        if let Some(s) = lookup("RUNNEL_JOB_NAME") {
            if !s.trim().is_empty() {
                opts.job_name = s;
            }
        }

        if let Some(s) = lookup("RUNNEL_RUNNER") {
            if let Ok(v) = s.parse::<RunnerKind>() {
                opts.runner = v;
            }
        }

        if let Some(s) = lookup("RUNNEL_ALIAS_SINGLE_INPUT_FLATTEN") {
            if let Ok(v) = s.parse::<bool>() {
                opts.alias_single_input_flatten = v;
            }
        }

        if let Some(s) = lookup("RUNNEL_VALIDATE_CREATE_VALUES") {
            if let Ok(v) = s.parse::<bool>() {
                opts.validate_create_values = v;
            }
        }

        if let Some(s) = lookup("RUNNEL_MAX_BATCH_ROWS") {
            if let Ok(v) = s.parse::<usize>() {
                opts.max_batch_rows = v;
            }
        }

        opts
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_batch_rows == 0 {
            return Err(Error::Config("max_batch_rows must be positive".into()));
        }
        Ok(())
    }
}
