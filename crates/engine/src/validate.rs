//! Workflow validation — run this before persisting or executing a
//! step list.
//!
//! Rules enforced:
//! 1. Step IDs must be unique (and non-empty) within the workflow.
//! 2. Every declared dependency must reference a step in the same workflow.
//! 3. The declared dependency graph must be acyclic.
//!
//! Dependencies are declarative only: execution is strictly in list order,
//! so validation exists to reject workflows that could never be scheduled
//! coherently, not to produce an ordering.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::Step;
use crate::EngineError;

/// Validate a workflow's step list.
///
/// # Errors
/// - [`EngineError::DuplicateStepId`] if two steps share an ID.
/// - [`EngineError::UnknownDependency`] if a dependency references a
///   missing step.
/// - [`EngineError::DependencyCycle`] if the declarations are cyclic.
pub fn validate_steps(steps: &[Step]) -> Result<(), EngineError> {
    // -----------------------------------------------------------------------
    // 1. Ensure step IDs are unique
    // -----------------------------------------------------------------------
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for step in steps {
        if step.id.is_empty() || !seen_ids.insert(step.id.as_str()) {
            return Err(EngineError::DuplicateStepId(step.id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Validate dependency references
    // -----------------------------------------------------------------------
    for step in steps {
        for dependency in &step.depends_on {
            if !seen_ids.contains(dependency.as_str()) {
                return Err(EngineError::UnknownDependency {
                    step_id: step.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // 3. Cycle check (Kahn's algorithm over dependency → dependent edges)
    // -----------------------------------------------------------------------
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();

    for step in steps {
        adjacency.entry(step.id.as_str()).or_default();
        in_degree.entry(step.id.as_str()).or_insert(0);
    }

    for step in steps {
        for dependency in &step.depends_on {
            adjacency
                .entry(dependency.as_str())
                .or_default()
                .push(step.id.as_str());
            *in_degree.entry(step.id.as_str()).or_insert(0) += 1;
        }
    }

    let mut ready: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut visited = 0usize;
    while let Some(step_id) = ready.pop_front() {
        visited += 1;

        if let Some(dependents) = adjacency.get(step_id) {
            for &dependent in dependents {
                let degree = in_degree.entry(dependent).or_insert(0);
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(dependent);
                }
            }
        }
    }

    // If we didn't visit every step the declarations contain a cycle.
    if visited != steps.len() {
        return Err(EngineError::DependencyCycle);
    }

    Ok(())
}
