use serde::Serialize;

use crate::model::task::{MAX_DEPTH, TaskId};
use crate::model::tree::{TaskTree, subtree_height};

/// Error type for move planning. Raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("cannot move a task under itself")]
    SelfParent,
    #[error("cannot move a task under its own descendant {0}")]
    Descendant(TaskId),
    #[error("target parent {0} is not in the destination project")]
    UnknownTarget(TaskId),
    #[error("moving under {parent} would put a task at depth {depth} (maximum is 2)")]
    DepthExceeded { parent: TaskId, depth: usize },
}

/// Why a candidate cannot take the moving task as a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligible {
    /// The candidate already sits at the deepest level
    MaxDepth,
    /// The candidate has room, but the moving task's own subtasks would not
    SubtreeTooDeep,
}

impl Ineligible {
    pub fn describe(self) -> &'static str {
        match self {
            Ineligible::MaxDepth => "at maximum depth",
            Ineligible::SubtreeTooDeep => "subtasks would be too deep",
        }
    }
}

/// One entry of the destination tree, as offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveTarget {
    pub task: TaskId,
    pub title: String,
    pub depth: usize,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Ineligible>,
}

/// List the possible new parents for `task_id` in `target`, in pre-order.
///
/// The task itself and its descendants are left out, so the list can never
/// produce a cycle. Candidates that cannot take the task as a child stay in
/// the list with `eligible = false` and a reason.
pub fn plan_targets(
    source: &TaskTree,
    task_id: TaskId,
    target: &TaskTree,
) -> Result<Vec<MoveTarget>, MoveError> {
    let task = source.find(task_id).ok_or(MoveError::TaskNotFound(task_id))?;
    let excluded = source.descendant_ids(task_id).unwrap_or_default();
    let height = subtree_height(task);

    let targets = target
        .flatten()
        .into_iter()
        .filter(|(t, _)| t.id != task_id && !excluded.contains(&t.id))
        .map(|(t, depth)| {
            let reason = if depth >= MAX_DEPTH {
                Some(Ineligible::MaxDepth)
            } else if depth + 1 + height > MAX_DEPTH {
                Some(Ineligible::SubtreeTooDeep)
            } else {
                None
            };
            MoveTarget {
                task: t.id,
                title: t.title.clone(),
                depth,
                eligible: reason.is_none(),
                reason,
            }
        })
        .collect();

    Ok(targets)
}

/// Check a move of `task_id` under `target_parent` (or to the top level of
/// `target` when `None`).
pub fn validate_move(
    source: &TaskTree,
    task_id: TaskId,
    target: &TaskTree,
    target_parent: Option<TaskId>,
) -> Result<(), MoveError> {
    let task = source.find(task_id).ok_or(MoveError::TaskNotFound(task_id))?;
    let Some(parent) = target_parent else {
        return Ok(());
    };

    if parent == task_id {
        return Err(MoveError::SelfParent);
    }
    if source.project_id == target.project_id
        && source
            .descendant_ids(task_id)
            .is_some_and(|ids| ids.contains(&parent))
    {
        return Err(MoveError::Descendant(parent));
    }

    let candidate = plan_targets(source, task_id, target)?
        .into_iter()
        .find(|c| c.task == parent)
        .ok_or(MoveError::UnknownTarget(parent))?;

    if candidate.eligible {
        Ok(())
    } else {
        Err(MoveError::DepthExceeded {
            parent,
            depth: candidate.depth + 1 + subtree_height(task),
        })
    }
}
