// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Plan file exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// revert_on_failure = true
/// timeout_secs = 600
///
/// [task.build]
/// cmd = "make"
/// revert = "make clean"
/// after = ["fetch"]
/// uses = ["workdir"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated plan.
///
/// Only obtainable through `TryFrom<RawPlanFile>`, which guarantees at
/// least one task, known and non-self `after` references and no cycles.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Run the compensating pass automatically when any task fails.
    #[serde(default)]
    pub revert_on_failure: bool,

    /// Cancel the run after this many seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command doing the work.
    pub cmd: String,

    /// Shell command undoing the work, run during the revert pass.
    #[serde(default)]
    pub revert: Option<String>,

    /// Tasks that must finish successfully before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Named resources this task holds exclusively while running.
    #[serde(default)]
    pub uses: Vec<String>,
}
