//! Pipeline context threaded from step to step.
//!
//! Later steps depend on facts established by earlier ones ("the project
//! directory exists", "shadcn init succeeded"). Those facts live here as
//! named gates and typed paths instead of flags captured by closures.

use crate::error::StepError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of a boolean fact in the pipeline context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Gate(&'static str);

impl Gate {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    gates: BTreeMap<Gate, bool>,
    paths: BTreeMap<&'static str, PathBuf>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, gate: Gate, open: bool) {
        self.gates.insert(gate, open);
    }

    pub fn open(&mut self, gate: Gate) {
        self.set(gate, true);
    }

    pub fn close(&mut self, gate: Gate) {
        self.set(gate, false);
    }

    /// Gates that were never set read as closed.
    pub fn is_open(&self, gate: Gate) -> bool {
        self.gates.get(&gate).copied().unwrap_or(false)
    }

    /// `Ok` when `gate` is open, otherwise a precondition failure carrying `reason`.
    pub fn require(&self, gate: Gate, reason: &str) -> Result<(), StepError> {
        if self.is_open(gate) {
            Ok(())
        } else {
            Err(StepError::precondition(format!("{} ({} not set)", reason, gate)))
        }
    }

    pub fn gates(&self) -> impl Iterator<Item = (Gate, bool)> + '_ {
        self.gates.iter().map(|(gate, open)| (*gate, *open))
    }

    pub fn set_path(&mut self, key: &'static str, path: impl Into<PathBuf>) {
        self.paths.insert(key, path.into());
    }

    pub fn path(&self, key: &'static str) -> Option<&Path> {
        self.paths.get(key).map(PathBuf::as_path)
    }
}
