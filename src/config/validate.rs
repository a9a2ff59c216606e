// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::{Result, TaskvisorError};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = TaskvisorError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_tasks(plan)?;
    validate_global_config(plan)?;
    validate_tasks(plan)?;
    validate_dag(plan)?;
    Ok(())
}

fn ensure_has_tasks(plan: &RawPlanFile) -> Result<()> {
    if plan.task.is_empty() {
        return Err(TaskvisorError::NoTasksSpecified);
    }
    Ok(())
}

fn validate_global_config(plan: &RawPlanFile) -> Result<()> {
    if plan.config.timeout_secs == Some(0) {
        return Err(TaskvisorError::ConfigError(
            "[config].timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_tasks(plan: &RawPlanFile) -> Result<()> {
    for (name, task) in plan.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(TaskvisorError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
        for dep in task.after.iter() {
            if dep == name {
                return Err(TaskvisorError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !plan.task.contains_key(dep) {
                return Err(TaskvisorError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
        if let Some(resource) = task.uses.iter().find(|r| r.trim().is_empty()) {
            return Err(TaskvisorError::ConfigError(format!(
                "task '{}' uses a resource with an empty name ({:?})",
                name, resource
            )));
        }
    }
    Ok(())
}

fn validate_dag(plan: &RawPlanFile) -> Result<()> {
    // Edge direction: dep -> task. For
    //   [task.B]
    //   after = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in plan.task.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in plan.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(TaskvisorError::GraphCycle(format!(
            "cycle detected in plan involving task '{}'",
            cycle.node_id()
        ))),
    }
}
