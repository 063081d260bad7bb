//! In-memory stand-in for the task service.
//!
//! Keeps per-project trees, records every call, and can be scripted to fail
//! or to hold an update response until a test releases it. Like the real
//! server, it does not cascade completion to subtasks.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use arbor::model::{NewTask, Project, ProjectId, Task, TaskId, TaskPatch, TaskTree};
use arbor::model::tree::{find_in_list, find_in_list_mut, subtree_height};
use arbor::ops::task_ops::merge_patch;
use arbor::remote::{RemoteError, Reparent, TodoApi};
use async_trait::async_trait;
use tokio::sync::{oneshot, watch};

pub const HOME: ProjectId = ProjectId(1);
pub const WORK: ProjectId = ProjectId(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListProjects,
    Fetch(ProjectId),
    Create(NewTask),
    Update(TaskId, TaskPatch),
    Delete(TaskId),
    Reparent(TaskId, Reparent),
}

#[derive(Default)]
struct State {
    projects: Vec<Project>,
    trees: HashMap<ProjectId, Vec<Task>>,
    next_id: u64,
    calls: Vec<Call>,
    fail_update: Option<RemoteError>,
    fail_fetches: usize,
    fail_fetch_after_write: bool,
    fail_reparent: Option<RemoteError>,
    gates: VecDeque<oneshot::Receiver<()>>,
    observer: Option<watch::Receiver<Arc<TaskTree>>>,
    observed: Vec<Arc<TaskTree>>,
}

pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        FakeApi {
            state: Mutex::new(State {
                next_id: 100,
                ..Default::default()
            }),
        }
    }

    /// HOME: A(1) > B(2) > C(3), X(4) > Y(5) > D(6), E(7)
    /// WORK: Z(20)
    pub fn sample() -> Self {
        let api = FakeApi::new();

        let mut a = Task::root(TaskId(1), HOME, "A");
        let mut b = Task::subtask(&a, TaskId(2), "B").unwrap();
        b.children.push(Task::subtask(&b, TaskId(3), "C").unwrap());
        a.children.push(b);

        let mut x = Task::root(TaskId(4), HOME, "X");
        x.position = 1;
        let mut y = Task::subtask(&x, TaskId(5), "Y").unwrap();
        y.children.push(Task::subtask(&y, TaskId(6), "D").unwrap());
        x.children.push(y);

        let mut e = Task::root(TaskId(7), HOME, "E");
        e.position = 2;

        api.insert_project(HOME, "Home", vec![a, x, e]);
        api.insert_project(WORK, "Work", vec![Task::root(TaskId(20), WORK, "Z")]);
        api
    }

    pub fn insert_project(&self, id: ProjectId, name: &str, roots: Vec<Task>) {
        let mut state = self.lock();
        state.projects.push(Project {
            id,
            name: name.to_string(),
            created_at: None,
        });
        state.trees.insert(id, roots);
    }

    // --- Scripting ---

    pub fn fail_next_update(&self, err: RemoteError) {
        self.lock().fail_update = Some(err);
    }

    pub fn fail_next_fetches(&self, count: usize) {
        self.lock().fail_fetches = count;
    }

    /// Accept the next create, delete or reparent, then fail the fetch
    /// that follows it.
    pub fn fail_fetch_after_next_write(&self) {
        self.lock().fail_fetch_after_write = true;
    }

    pub fn fail_next_reparent(&self, err: RemoteError) {
        self.lock().fail_reparent = Some(err);
    }

    /// Hold the response of the next update until `gate` fires.
    pub fn gate_next_update(&self, gate: oneshot::Receiver<()>) {
        self.lock().gates.push_back(gate);
    }

    /// Record what `rx` shows each time an update request arrives.
    pub fn observe(&self, rx: watch::Receiver<Arc<TaskTree>>) {
        self.lock().observer = Some(rx);
    }

    /// Corrupt a stored task, as a misbehaving server might.
    pub fn tamper(&self, project: ProjectId, id: TaskId, f: impl FnOnce(&mut Task)) {
        let mut state = self.lock();
        let roots = state.trees.get_mut(&project).unwrap();
        f(find_in_list_mut(roots, id).unwrap());
    }

    // --- Inspection ---

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Calls other than fetches.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Fetch(_) | Call::ListProjects))
            .collect()
    }

    pub fn observed(&self) -> Vec<Arc<TaskTree>> {
        self.lock().observed.clone()
    }

    pub fn server_tree(&self, project: ProjectId) -> TaskTree {
        let state = self.lock();
        TaskTree::new(project, state.trees.get(&project).cloned().unwrap_or_default())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl State {
    fn wrote(&mut self) {
        if std::mem::take(&mut self.fail_fetch_after_write) {
            self.fail_fetches += 1;
        }
    }
}

fn not_found() -> RemoteError {
    RemoteError::Rejected {
        status: 404,
        message: "Todo not found".to_string(),
    }
}

fn project_of(trees: &HashMap<ProjectId, Vec<Task>>, id: TaskId) -> Option<ProjectId> {
    trees
        .iter()
        .find(|(_, roots)| find_in_list(roots, id).is_some())
        .map(|(project, _)| *project)
}

fn detach(tasks: &mut Vec<Task>, id: TaskId) -> Option<Task> {
    if let Some(i) = tasks.iter().position(|t| t.id == id) {
        return Some(tasks.remove(i));
    }
    tasks.iter_mut().find_map(|t| detach(&mut t.children, id))
}

fn renumber(tasks: &mut [Task]) {
    for (i, task) in tasks.iter_mut().enumerate() {
        task.position = i as u32;
    }
}

fn relocate(task: &mut Task, project: ProjectId, parent: Option<TaskId>, depth: usize) {
    task.project_id = project;
    task.parent_id = parent;
    task.depth = depth;
    let id = task.id;
    for child in &mut task.children {
        relocate(child, project, Some(id), depth + 1);
    }
}

#[async_trait]
impl TodoApi for FakeApi {
    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(Call::ListProjects);
        Ok(state.projects.clone())
    }

    async fn fetch_tree(&self, project: ProjectId) -> Result<Vec<Task>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(Call::Fetch(project));
        if state.fail_fetches > 0 {
            state.fail_fetches -= 1;
            return Err(RemoteError::Network("connection reset".to_string()));
        }
        Ok(state.trees.get(&project).cloned().unwrap_or_default())
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, RemoteError> {
        let mut state = self.lock();
        state.calls.push(Call::Create(task.clone()));
        state.next_id += 1;
        let id = TaskId(state.next_id);

        let roots = state.trees.entry(task.project_id).or_default();
        let mut created = Task::root(id, task.project_id, task.title.clone());
        created.description = task.description.clone();
        created.priority = task.priority.unwrap_or_default();

        match task.parent_id {
            Some(parent_id) => {
                let parent = find_in_list_mut(roots, parent_id).ok_or_else(not_found)?;
                created = Task::subtask(parent, id, task.title.clone()).ok_or_else(|| {
                    RemoteError::Rejected {
                        status: 400,
                        message: "Maximum nesting depth reached".to_string(),
                    }
                })?;
                created.description = task.description.clone();
                created.priority = task.priority.unwrap_or_default();
                parent.children.push(created.clone());
            }
            None => {
                created.position = roots.len() as u32;
                roots.push(created.clone());
            }
        }
        state.wrote();
        Ok(created)
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, RemoteError> {
        let (result, gate) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.calls.push(Call::Update(id, patch.clone()));
            if let Some(rx) = &state.observer {
                let seen = rx.borrow().clone();
                state.observed.push(seen);
            }
            let gate = state.gates.pop_front();

            let result = match state.fail_update.take() {
                Some(err) => Err(err),
                None => state
                    .trees
                    .values_mut()
                    .find_map(|roots| find_in_list_mut(roots, id))
                    .map(|task| {
                        merge_patch(task, patch);
                        task.clone()
                    })
                    .ok_or_else(not_found),
            };
            (result, gate)
        };

        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.calls.push(Call::Delete(id));
        let removed = state.trees.values_mut().any(|roots| {
            let found = detach(roots, id).is_some();
            if found {
                renumber(roots);
            }
            found
        });
        if !removed {
            return Err(not_found());
        }
        state.wrote();
        Ok(())
    }

    async fn reparent_task(&self, id: TaskId, request: &Reparent) -> Result<(), RemoteError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.calls.push(Call::Reparent(id, request.clone()));
        if let Some(err) = state.fail_reparent.take() {
            return Err(err);
        }

        let source = project_of(&state.trees, id).ok_or_else(not_found)?;
        let height = subtree_height(find_in_list(&state.trees[&source], id).unwrap());
        let depth = match request.new_parent_id {
            Some(parent_id) => {
                let parent = state
                    .trees
                    .get(&request.new_project_id)
                    .and_then(|roots| find_in_list(roots, parent_id))
                    .ok_or_else(not_found)?;
                parent.depth + 1
            }
            None => 0,
        };
        if depth + height > 2 {
            return Err(RemoteError::Rejected {
                status: 400,
                message: "Moving this todo would exceed maximum depth".to_string(),
            });
        }

        let source_roots = state.trees.get_mut(&source).unwrap();
        let mut task = detach(source_roots, id).unwrap();
        renumber(source_roots);
        relocate(&mut task, request.new_project_id, request.new_parent_id, depth);

        let target = state.trees.entry(request.new_project_id).or_default();
        let siblings = match request.new_parent_id {
            Some(parent_id) => &mut find_in_list_mut(target, parent_id).ok_or_else(not_found)?.children,
            None => target,
        };
        let at = (request.new_order as usize).min(siblings.len());
        siblings.insert(at, task);
        renumber(siblings);
        state.wrote();
        Ok(())
    }
}
