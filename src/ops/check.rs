use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::model::task::{MAX_DEPTH, ProjectId, Task, TaskId};

/// A structural invariant broken by a tree (usually one received from the server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeViolation {
    /// Stored depth disagrees with the node's position
    DepthMismatch {
        task: TaskId,
        expected: usize,
        found: usize,
    },
    /// Node sits below `MAX_DEPTH`
    TooDeep { task: TaskId, depth: usize },
    /// `parent_id` does not name the enclosing node
    ParentMismatch {
        task: TaskId,
        expected: Option<TaskId>,
        found: Option<TaskId>,
    },
    /// Node claims a different project than its tree
    ProjectMismatch {
        task: TaskId,
        expected: ProjectId,
        found: ProjectId,
    },
    /// Same id appears more than once
    DuplicateId { task: TaskId },
}

impl fmt::Display for TreeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeViolation::DepthMismatch {
                task,
                expected,
                found,
            } => write!(f, "task {} has depth {} but sits at depth {}", task, found, expected),
            TreeViolation::TooDeep { task, depth } => {
                write!(f, "task {} is nested at depth {} (maximum {})", task, depth, MAX_DEPTH)
            }
            TreeViolation::ParentMismatch {
                task,
                expected,
                found,
            } => write!(
                f,
                "task {} names parent {} but sits under {}",
                task,
                fmt_parent(*found),
                fmt_parent(*expected)
            ),
            TreeViolation::ProjectMismatch {
                task,
                expected,
                found,
            } => write!(f, "task {} belongs to project {}, not {}", task, found, expected),
            TreeViolation::DuplicateId { task } => write!(f, "task {} appears more than once", task),
        }
    }
}

fn fmt_parent(parent: Option<TaskId>) -> String {
    parent.map_or_else(|| "nothing".to_string(), |p| p.to_string())
}

/// Validate the structural invariants of a project's tree.
///
/// Read-only. Checks, for every node:
/// 1. stored depth equals positional depth, and depth ≤ `MAX_DEPTH`
/// 2. `parent_id` is the enclosing node (`None` at the top level)
/// 3. project equals the tree's project
/// 4. the id occurs once in the whole tree
///
/// Acyclicity needs no check: a nested value cannot contain itself.
pub fn check_tree(project: ProjectId, roots: &[Task]) -> Vec<TreeViolation> {
    let mut violations = Vec::new();
    let mut seen = HashSet::new();
    check_level(project, roots, None, 0, &mut seen, &mut violations);
    violations
}

/// Validate a subtree that is about to replace `slot` in a tree: it must keep
/// the slot's depth and parent, and be internally consistent.
pub fn check_replacement(project: ProjectId, slot: &Task, subtree: &Task) -> Vec<TreeViolation> {
    let mut violations = Vec::new();
    let mut seen = HashSet::new();
    check_task(
        project,
        subtree,
        slot.parent_id,
        slot.depth,
        &mut seen,
        &mut violations,
    );
    violations
}

fn check_level(
    project: ProjectId,
    tasks: &[Task],
    parent: Option<TaskId>,
    depth: usize,
    seen: &mut HashSet<TaskId>,
    violations: &mut Vec<TreeViolation>,
) {
    for task in tasks {
        check_task(project, task, parent, depth, seen, violations);
    }
}

fn check_task(
    project: ProjectId,
    task: &Task,
    parent: Option<TaskId>,
    depth: usize,
    seen: &mut HashSet<TaskId>,
    violations: &mut Vec<TreeViolation>,
) {
    if !seen.insert(task.id) {
        violations.push(TreeViolation::DuplicateId { task: task.id });
    }
    if task.depth != depth {
        violations.push(TreeViolation::DepthMismatch {
            task: task.id,
            expected: depth,
            found: task.depth,
        });
    }
    if depth > MAX_DEPTH {
        violations.push(TreeViolation::TooDeep {
            task: task.id,
            depth,
        });
    }
    if task.parent_id != parent {
        violations.push(TreeViolation::ParentMismatch {
            task: task.id,
            expected: parent,
            found: task.parent_id,
        });
    }
    if task.project_id != project {
        violations.push(TreeViolation::ProjectMismatch {
            task: task.id,
            expected: project,
            found: task.project_id,
        });
    }
    check_level(project, &task.children, Some(task.id), depth + 1, seen, violations);
}
