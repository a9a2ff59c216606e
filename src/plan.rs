// src/plan.rs

//! Turn a validated [`PlanFile`] into a task graph.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::PlanFile;
use crate::exec::{shell_task, with_shell_revert};
use crate::graph::{Graph, Resource, Task};
use crate::supervisor::Supervisor;

/// Task graph built from a plan file, plus the resources it declared.
#[derive(Debug)]
pub struct Plan {
    tasks: BTreeMap<String, Task>,
    resources: BTreeMap<String, Resource>,
    roots: Vec<Task>,
}

/// Build one task per `[task.<name>]`, one resource per distinct name in
/// `uses`, and wire every `after` edge.
pub fn build_plan(plan: &PlanFile) -> Plan {
    let mut resources: BTreeMap<String, Resource> = BTreeMap::new();
    let mut tasks: BTreeMap<String, Task> = BTreeMap::new();

    for (name, tc) in plan.task.iter() {
        let mut task = shell_task(name, &tc.cmd);
        for resource_name in tc.uses.iter() {
            let resource = resources
                .entry(resource_name.clone())
                .or_insert_with(|| Resource::new(resource_name.clone()));
            task = task.uses(resource);
        }
        if let Some(revert) = &tc.revert {
            task = with_shell_revert(task, revert);
        }
        tasks.insert(name.clone(), task);
    }

    for (name, tc) in plan.task.iter() {
        let Some(task) = tasks.get(name) else { continue };
        for dep in tc.after.iter() {
            if let Some(upstream) = tasks.get(dep) {
                task.add_upstream(upstream);
            }
        }
    }

    let roots: Vec<Task> = plan
        .task
        .iter()
        .filter(|(_, tc)| tc.after.is_empty())
        .filter_map(|(name, _)| tasks.get(name).cloned())
        .collect();

    debug!(
        tasks = tasks.len(),
        resources = resources.len(),
        roots = roots.len(),
        "built plan graph"
    );

    Plan {
        tasks,
        resources,
        roots,
    }
}

impl Plan {
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn supervisor(&self) -> Supervisor {
        Supervisor::new(self)
    }
}

impl Graph for Plan {
    fn roots(&self) -> Vec<Task> {
        self.roots.clone()
    }

    fn leaves(&self) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|task| task.downstream().is_empty())
            .cloned()
            .collect()
    }
}
