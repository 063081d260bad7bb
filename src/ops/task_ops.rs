use crate::model::task::{MAX_DEPTH, MAX_TITLE_LEN, NewTask, ProjectId, Task, TaskId, TaskPatch};
use crate::model::tree::{TaskTree, find_in_list_mut};

/// Error type for task operations. Raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("title must be 500 characters or less")]
    TitleTooLong,
    #[error("cannot add subtask: maximum nesting depth (3) reached")]
    MaxDepthReached,
    #[error("task belongs to project {found}, not {expected}")]
    ProjectMismatch {
        expected: ProjectId,
        found: ProjectId,
    },
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Trim a title and check it is non-empty and within `MAX_TITLE_LEN` characters.
pub fn validate_title(title: &str) -> Result<String, TaskError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(TaskError::TitleTooLong);
    }
    Ok(trimmed.to_string())
}

/// Normalize a patch: trimmed title (validated), trimmed description.
pub fn validate_patch(patch: &TaskPatch) -> Result<TaskPatch, TaskError> {
    let mut patch = patch.clone();
    if let Some(title) = &patch.title {
        patch.title = Some(validate_title(title)?);
    }
    if let Some(description) = &patch.description {
        patch.description = Some(description.trim().to_string());
    }
    Ok(patch)
}

/// Check a create request against the current tree and return the request
/// that should be sent. The tree itself is not touched: the server assigns
/// ids and ordering, so the caller refetches once the create succeeds.
pub fn prepare_create(tree: &TaskTree, draft: &NewTask) -> Result<NewTask, TaskError> {
    if draft.project_id != tree.project_id {
        return Err(TaskError::ProjectMismatch {
            expected: tree.project_id,
            found: draft.project_id,
        });
    }
    let title = validate_title(&draft.title)?;

    if let Some(parent_id) = draft.parent_id {
        let depth = tree
            .depth_of(parent_id)
            .ok_or(TaskError::NotFound(parent_id))?;
        if depth >= MAX_DEPTH {
            return Err(TaskError::MaxDepthReached);
        }
    }

    let description = draft
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok(NewTask {
        project_id: draft.project_id,
        parent_id: draft.parent_id,
        title,
        description,
        priority: draft.priority,
    })
}

/// Delete, like create, is refetch-driven; only existence is checked locally.
pub fn ensure_exists(tree: &TaskTree, id: TaskId) -> Result<(), TaskError> {
    if tree.contains(id) {
        Ok(())
    } else {
        Err(TaskError::NotFound(id))
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Return a new tree with `patch` merged into task `id`.
///
/// Marking a task complete also marks every descendant complete. That cascade
/// is a display convenience: the server's answer replaces it on reconcile.
pub fn apply_update(tree: &TaskTree, id: TaskId, patch: &TaskPatch) -> Result<TaskTree, TaskError> {
    let mut next = tree.clone();
    let task = next.find_mut(id).ok_or(TaskError::NotFound(id))?;
    merge_patch(task, patch);
    if patch.completed == Some(true) {
        cascade_complete(task);
    }
    Ok(next)
}

/// Copy each present field of `patch` onto `task`.
pub fn merge_patch(task: &mut Task, patch: &TaskPatch) {
    if let Some(title) = &patch.title {
        task.title = title.clone();
    }
    if let Some(description) = &patch.description {
        task.description = if description.is_empty() {
            None
        } else {
            Some(description.clone())
        };
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(completed) = patch.completed {
        task.completed = completed;
    }
    if let Some(collapsed) = patch.collapsed {
        task.collapsed = collapsed;
    }
}

/// Force `completed` on every descendant of `task`.
pub fn cascade_complete(task: &mut Task) {
    for child in &mut task.children {
        child.completed = true;
        cascade_complete(child);
    }
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// Return a new tree where the node with `subtree.id` and its whole children
/// sequence are replaced by `subtree`. Nothing of the old node survives.
pub fn replace_subtree(tree: &TaskTree, subtree: Task) -> Result<TaskTree, TaskError> {
    let mut next = tree.clone();
    let slot = find_in_list_mut(&mut next.roots, subtree.id).ok_or(TaskError::NotFound(subtree.id))?;
    *slot = subtree;
    Ok(next)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
