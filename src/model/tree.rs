//! A project's task tree and the pure traversal primitives over it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::task::{ProjectId, Task, TaskId};

/// The task tree of one project: root tasks in display order, each owning
/// its subtasks recursively.
///
/// Trees are treated as values. Every mutation produces a new tree, so an
/// optimistic version and the authoritative version never share nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTree {
    pub project_id: ProjectId,
    pub roots: Vec<Task>,
}

impl TaskTree {
    pub fn new(project_id: ProjectId, roots: Vec<Task>) -> Self {
        TaskTree { project_id, roots }
    }

    pub fn empty(project_id: ProjectId) -> Self {
        TaskTree::new(project_id, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of tasks at every level.
    pub fn count(&self) -> usize {
        let mut n = 0;
        for_each_task(&self.roots, &mut |_| n += 1);
        n
    }

    /// Depth-first lookup; first match wins.
    pub fn find(&self, id: TaskId) -> Option<&Task> {
        find_in_list(&self.roots, id)
    }

    pub fn find_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        find_in_list_mut(&mut self.roots, id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.find(id).is_some()
    }

    /// Depth of the node as positioned in this tree (not its stored field).
    pub fn depth_of(&self, id: TaskId) -> Option<usize> {
        self.ancestors(id).map(|chain| chain.len())
    }

    /// Ancestor ids of `id`, nearest parent last. `None` if `id` is absent.
    pub fn ancestors(&self, id: TaskId) -> Option<Vec<TaskId>> {
        let mut path = Vec::new();
        if path_to(&self.roots, id, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    /// Ids of every task strictly below `id`. `None` if `id` is absent.
    pub fn descendant_ids(&self, id: TaskId) -> Option<HashSet<TaskId>> {
        self.find(id).map(descendant_ids)
    }

    /// Pre-order listing of `(task, depth)` where depth is positional.
    pub fn flatten(&self) -> Vec<(&Task, usize)> {
        let mut out = Vec::new();
        flatten_into(&self.roots, 0, &mut out);
        out
    }

    /// Every task id in the tree, in pre-order.
    pub fn ids(&self) -> Vec<TaskId> {
        let mut ids = Vec::new();
        for_each_task(&self.roots, &mut |t| ids.push(t.id));
        ids
    }
}

/// Collect the ids of all descendants of `task` (excluding `task` itself).
pub fn descendant_ids(task: &Task) -> HashSet<TaskId> {
    let mut ids = HashSet::new();
    for_each_task(&task.children, &mut |t| {
        ids.insert(t.id);
    });
    ids
}

/// Number of levels below `task`: 0 for a leaf, 1 with children only, etc.
pub fn subtree_height(task: &Task) -> usize {
    task.children
        .iter()
        .map(|c| 1 + subtree_height(c))
        .max()
        .unwrap_or(0)
}

pub fn find_in_list(tasks: &[Task], id: TaskId) -> Option<&Task> {
    for task in tasks {
        if task.id == id {
            return Some(task);
        }
        if let Some(t) = find_in_list(&task.children, id) {
            return Some(t);
        }
    }
    None
}

pub fn find_in_list_mut(tasks: &mut [Task], id: TaskId) -> Option<&mut Task> {
    for task in tasks.iter_mut() {
        if task.id == id {
            return Some(task);
        }
        if let Some(t) = find_in_list_mut(&mut task.children, id) {
            return Some(t);
        }
    }
    None
}

/// Visit every task in pre-order.
pub fn for_each_task(tasks: &[Task], f: &mut dyn FnMut(&Task)) {
    for task in tasks {
        f(task);
        for_each_task(&task.children, f);
    }
}

fn path_to(tasks: &[Task], id: TaskId, path: &mut Vec<TaskId>) -> bool {
    for task in tasks {
        if task.id == id {
            return true;
        }
        path.push(task.id);
        if path_to(&task.children, id, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn flatten_into<'a>(tasks: &'a [Task], depth: usize, out: &mut Vec<(&'a Task, usize)>) {
    for task in tasks {
        out.push((task, depth));
        flatten_into(&task.children, depth + 1, out);
    }
}
