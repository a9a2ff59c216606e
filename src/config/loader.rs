// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::Result;

/// Load a plan file and return the raw, unvalidated model.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawPlanFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a plan file and validate it (unknown `after` references, self
/// dependencies, empty commands, cycles).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let raw = load_from_path(&path)?;
    PlanFile::try_from(raw)
}

/// `Taskvisor.toml` in the current working directory.
pub fn default_plan_path() -> PathBuf {
    PathBuf::from("Taskvisor.toml")
}
