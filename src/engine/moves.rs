use std::sync::Arc;

use super::{Engine, SyncError};
use crate::model::{ProjectId, TaskId, TaskTree};
use crate::ops::move_ops::{self, MoveTarget};
use crate::remote::{Reparent, RemoteError, TodoApi};

/// Where to put a task: a project, an optional parent in it, and an index
/// among the new siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub task: TaskId,
    pub target_project: ProjectId,
    pub target_parent: Option<TaskId>,
    pub position: u32,
}

impl MoveRequest {
    /// Top of `target_project`, first position.
    pub fn to_project(task: TaskId, target_project: ProjectId) -> Self {
        MoveRequest {
            task,
            target_project,
            target_parent: None,
            position: 0,
        }
    }

    pub fn under(mut self, parent: TaskId) -> Self {
        self.target_parent = Some(parent);
        self
    }
}

/// What the caller should show after a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Same project, or the destination could not be loaded: the source
    /// tree, reloaded when possible
    Reloaded { tree: Arc<TaskTree> },
    /// Moved elsewhere: the destination's tree. The source is closed.
    Switched {
        project: ProjectId,
        tree: Arc<TaskTree>,
    },
}

impl MoveOutcome {
    pub fn tree(&self) -> &Arc<TaskTree> {
        match self {
            MoveOutcome::Reloaded { tree } | MoveOutcome::Switched { tree, .. } => tree,
        }
    }
}

impl<A: TodoApi> Engine<A> {
    /// Candidate parents for `task` in `target_project`, fetched fresh.
    pub async fn valid_targets(
        &self,
        project: ProjectId,
        task: TaskId,
        target_project: ProjectId,
    ) -> Result<Vec<MoveTarget>, SyncError> {
        let (source, target) = self.move_trees(project, target_project).await?;
        Ok(move_ops::plan_targets(&source, task, &target)?)
    }

    /// Validate and send a reparent, then re-derive the affected tree.
    ///
    /// Nothing is spliced locally. A move within a project reloads it; a move
    /// to another project opens the destination and then closes the source.
    /// Once the server has accepted the move, a failed reload is logged and
    /// the call still succeeds.
    pub async fn move_task(
        &self,
        project: ProjectId,
        request: &MoveRequest,
    ) -> Result<MoveOutcome, SyncError> {
        let (source, target) = self.move_trees(project, request.target_project).await?;
        move_ops::validate_move(&source, request.task, &target, request.target_parent)?;

        let body = Reparent {
            new_parent_id: request.target_parent,
            new_project_id: request.target_project,
            new_order: request.position,
        };
        self.api
            .reparent_task(request.task, &body)
            .await
            .map_err(|err| match err {
                RemoteError::Rejected { message, .. } => SyncError::MoveRejected(message),
                other => SyncError::Remote(other),
            })?;
        log::info!(
            "Moved {} to project {} under {}",
            request.task,
            request.target_project,
            request
                .target_parent
                .map_or_else(|| "top level".to_string(), |p| p.to_string())
        );

        if request.target_project != project {
            match self.refresh(request.target_project).await {
                Ok(tree) => {
                    self.close(project);
                    return Ok(MoveOutcome::Switched {
                        project: request.target_project,
                        tree,
                    });
                }
                Err(err) => log::warn!(
                    "Loading project {} failed ({}); staying on project {}",
                    request.target_project,
                    err,
                    project
                ),
            }
        }
        let tree = self.reload_after_write(project, source).await;
        Ok(MoveOutcome::Reloaded { tree })
    }

    /// Source and destination trees for move planning, the destination
    /// always fetched fresh. Within one project both are the reloaded tree.
    async fn move_trees(
        &self,
        project: ProjectId,
        target_project: ProjectId,
    ) -> Result<(Arc<TaskTree>, Arc<TaskTree>), SyncError> {
        if target_project == project {
            let tree = self.refresh(project).await?;
            Ok((Arc::clone(&tree), tree))
        } else {
            let source = self.open(project).await?;
            let target = Arc::new(self.fetch(target_project).await?);
            Ok((source, target))
        }
    }
}
