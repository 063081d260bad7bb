//! Optimistic updates against a remote task service.
//!
//! The engine holds one accepted tree per open project and replaces it
//! wholesale whenever a new version exists: optimistic, spliced with the
//! server's answer, or reloaded. Each version is published on a `watch`
//! channel so a front end can redraw from the latest value.

mod moves;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::model::tree::descendant_ids;
use crate::model::{NewTask, Project, ProjectId, StaleResponses, Task, TaskId, TaskPatch, TaskTree};
use crate::ops::check::{check_replacement, check_tree};
use crate::ops::move_ops::MoveError;
use crate::ops::task_ops::{self, TaskError};
use crate::remote::{RemoteError, TodoApi};

pub use moves::{MoveOutcome, MoveRequest};

/// Error returned by every engine operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Input rejected locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] TaskError),
    /// Move target rejected locally; nothing was sent.
    #[error(transparent)]
    InvalidMove(#[from] MoveError),
    /// The server refused a move. Carries its message untouched.
    #[error("{0}")]
    MoveRejected(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub struct Engine<A: TodoApi> {
    api: A,
    policy: StaleResponses,
    trees: Mutex<HashMap<ProjectId, watch::Sender<Arc<TaskTree>>>>,
    tickets: Mutex<Tickets>,
    next_ticket: AtomicU64,
}

/// Ordering of update responses.
///
/// `newest` holds the latest in-flight request per task. `spliced` holds, per
/// task, the ticket of the newest response already spliced over it, whether
/// it was spliced as that task's own subtree or as part of an ancestor's.
#[derive(Debug, Default)]
struct Tickets {
    newest: HashMap<TaskId, u64>,
    spliced: HashMap<TaskId, u64>,
}

impl Tickets {
    fn issue(&mut self, id: TaskId, ticket: u64) {
        self.newest.insert(id, ticket);
    }

    /// Settle the request `ticket` for `id`. Returns whether its response
    /// is still current: no newer request for `id` is pending, and no newer
    /// response has been spliced over any task in `covered`.
    fn settle(&mut self, id: TaskId, ticket: u64, covered: &[TaskId]) -> bool {
        let newest = self.newest.get(&id) == Some(&ticket);
        if newest {
            self.newest.remove(&id);
        }
        let overtaken = covered
            .iter()
            .any(|task| self.spliced.get(task).is_some_and(|&t| t > ticket));
        newest && !overtaken
    }

    /// Note that the response to `ticket` now covers `covered`.
    fn record_splice(&mut self, ticket: u64, covered: &[TaskId]) {
        // With nothing in flight, every later ticket is newer than any stamp
        if self.newest.is_empty() {
            self.spliced.clear();
            return;
        }
        for task in covered {
            let stamp = self.spliced.entry(*task).or_insert(ticket);
            *stamp = (*stamp).max(ticket);
        }
    }
}

/// The task and every descendant in a server subtree.
fn covered_ids(subtree: &Task) -> Vec<TaskId> {
    let mut ids: Vec<TaskId> = descendant_ids(subtree).into_iter().collect();
    ids.push(subtree.id);
    ids
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A: TodoApi> Engine<A> {
    pub fn new(api: A, policy: StaleResponses) -> Self {
        Engine {
            api,
            policy,
            trees: Mutex::new(HashMap::new()),
            tickets: Mutex::new(Tickets::default()),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> StaleResponses {
        self.policy
    }

    // -----------------------------------------------------------------------
    // Project state
    // -----------------------------------------------------------------------

    /// The accepted tree of `project`, fetching it on first use.
    pub async fn open(&self, project: ProjectId) -> Result<Arc<TaskTree>, SyncError> {
        match self.snapshot(project) {
            Some(tree) => Ok(tree),
            None => self.refresh(project).await,
        }
    }

    /// Replace the accepted tree of `project` with a fresh fetch.
    pub async fn refresh(&self, project: ProjectId) -> Result<Arc<TaskTree>, SyncError> {
        let tree = self.fetch(project).await?;
        log::info!("Loaded project {} ({} tasks)", project, tree.count());
        Ok(self.publish(tree))
    }

    /// Latest published tree, if the project is open.
    pub fn snapshot(&self, project: ProjectId) -> Option<Arc<TaskTree>> {
        lock(&self.trees)
            .get(&project)
            .map(|tx| Arc::clone(&tx.borrow()))
    }

    /// Follow every version of an open project's tree.
    pub fn subscribe(&self, project: ProjectId) -> Option<watch::Receiver<Arc<TaskTree>>> {
        lock(&self.trees).get(&project).map(|tx| tx.subscribe())
    }

    /// Forget a project. Subscribers see their channel close.
    pub fn close(&self, project: ProjectId) {
        if lock(&self.trees).remove(&project).is_some() {
            log::debug!("Closed project {}", project);
        }
    }

    pub async fn projects(&self) -> Result<Vec<Project>, SyncError> {
        Ok(self.api.list_projects().await?)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Apply `patch` to task `id` optimistically, then reconcile.
    ///
    /// The patched tree (with cascade completion) is published before the
    /// request goes out. A success splices the server's subtree over the
    /// task; a failure reloads the whole project before the error is
    /// returned, so callers always observe a server-derived tree.
    pub async fn apply_update(
        &self,
        project: ProjectId,
        id: TaskId,
        patch: &TaskPatch,
    ) -> Result<Arc<TaskTree>, SyncError> {
        let patch = task_ops::validate_patch(patch)?;
        let base = self.open(project).await?;

        let optimistic = task_ops::apply_update(&base, id, &patch)?;
        self.publish(optimistic);
        log::debug!("Optimistic update of {} published", id);

        let ticket = self.issue_ticket(id);
        let result = self.api.update_task(id, &patch).await;

        let reconciled = match result {
            Ok(subtree) => self.reconcile(project, id, ticket, subtree),
            Err(err) => {
                self.settle_ticket(id, ticket, &[]);
                Err(err)
            }
        };
        match reconciled {
            Ok(Some(tree)) => {
                log::info!("Updated {}", id);
                Ok(tree)
            }
            Ok(None) => {
                log::debug!("Discarding stale response for {}", id);
                self.open(project).await
            }
            Err(err) => Err(self.rollback(project, &base, err).await),
        }
    }

    /// Create a task, then reload the project.
    ///
    /// The local tree is not touched: ids and ordering come from the server.
    pub async fn create(&self, draft: &NewTask) -> Result<Arc<TaskTree>, SyncError> {
        let project = draft.project_id;
        let base = self.open(project).await?;
        let request = task_ops::prepare_create(&base, draft)?;

        let task = self.api.create_task(&request).await?;
        log::info!("Created {} in project {}", task.id, project);
        Ok(self.reload_after_write(project, base).await)
    }

    /// Delete a task and its subtasks, then reload the project.
    pub async fn delete(&self, project: ProjectId, id: TaskId) -> Result<Arc<TaskTree>, SyncError> {
        let base = self.open(project).await?;
        task_ops::ensure_exists(&base, id)?;

        self.api.delete_task(id).await?;
        log::info!("Deleted {} from project {}", id, project);
        Ok(self.reload_after_write(project, base).await)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Fetch a project's tree and check it before anyone sees it.
    async fn fetch(&self, project: ProjectId) -> Result<TaskTree, RemoteError> {
        let roots = self.api.fetch_tree(project).await?;
        let violations = check_tree(project, &roots);
        if let Some(first) = violations.first() {
            for violation in &violations {
                log::warn!("Project {}: {}", project, violation);
            }
            return Err(RemoteError::Malformed(format!(
                "inconsistent tree for project {}: {}",
                project, first
            )));
        }
        Ok(TaskTree::new(project, roots))
    }

    /// Reload `project` after the server accepted a write. The write stands
    /// even if the reload fails; the last accepted tree stays published.
    async fn reload_after_write(&self, project: ProjectId, fallback: Arc<TaskTree>) -> Arc<TaskTree> {
        match self.refresh(project).await {
            Ok(tree) => tree,
            Err(err) => {
                log::warn!(
                    "Reload of project {} failed ({}); showing last accepted tree",
                    project,
                    err
                );
                self.snapshot(project).unwrap_or(fallback)
            }
        }
    }

    /// Settle a successful update response and splice it if it is current.
    /// `Ok(None)` means it was stale and discarded.
    fn reconcile(
        &self,
        project: ProjectId,
        id: TaskId,
        ticket: u64,
        subtree: Task,
    ) -> Result<Option<Arc<TaskTree>>, RemoteError> {
        let covered = covered_ids(&subtree);
        let mut tickets = lock(&self.tickets);
        let current = tickets.settle(id, ticket, &covered);
        if !current && self.policy == StaleResponses::Discard {
            return Ok(None);
        }
        let tree = self.splice(project, subtree)?;
        tickets.record_splice(ticket, &covered);
        Ok(Some(tree))
    }

    fn publish(&self, tree: TaskTree) -> Arc<TaskTree> {
        let project = tree.project_id;
        let tree = Arc::new(tree);
        let mut trees = lock(&self.trees);
        match trees.get(&project) {
            Some(tx) => {
                tx.send_replace(Arc::clone(&tree));
            }
            None => {
                let (tx, _) = watch::channel(Arc::clone(&tree));
                trees.insert(project, tx);
            }
        }
        tree
    }

    /// Replace the server's subtree into the latest published tree.
    fn splice(&self, project: ProjectId, subtree: Task) -> Result<Arc<TaskTree>, RemoteError> {
        let current = self
            .snapshot(project)
            .ok_or_else(|| RemoteError::Malformed(format!("project {} is not open", project)))?;
        let slot = current.find(subtree.id).ok_or_else(|| {
            RemoteError::Malformed(format!("{} is no longer in project {}", subtree.id, project))
        })?;

        let violations = check_replacement(project, slot, &subtree);
        if let Some(first) = violations.first() {
            return Err(RemoteError::Malformed(first.to_string()));
        }

        let next = task_ops::replace_subtree(&current, subtree)
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        if let Some(first) = check_tree(project, &next.roots).first() {
            return Err(RemoteError::Malformed(first.to_string()));
        }
        Ok(self.publish(next))
    }

    /// Discard optimistic state by reloading the project. If the reload also
    /// fails, fall back to `base`, the tree accepted before the update.
    async fn rollback(&self, project: ProjectId, base: &Arc<TaskTree>, err: RemoteError) -> SyncError {
        log::info!("Update failed ({}); reloading project {}", err, project);
        match self.fetch(project).await {
            Ok(tree) => {
                self.publish(tree);
            }
            Err(fetch_err) => {
                log::warn!(
                    "Reload of project {} failed ({}); restoring last accepted tree",
                    project,
                    fetch_err
                );
                self.publish(TaskTree::clone(base));
            }
        }
        SyncError::Remote(err)
    }

    fn issue_ticket(&self, id: TaskId) -> u64 {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
        lock(&self.tickets).issue(id, ticket);
        ticket
    }

    fn settle_ticket(&self, id: TaskId, ticket: u64, covered: &[TaskId]) -> bool {
        lock(&self.tickets).settle(id, ticket, covered)
    }
}
