use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Deepest allowed nesting (0 = top-level). Three levels in total.
pub const MAX_DEPTH: usize = 2;

/// Maximum title length in characters, as enforced by the server.
pub const MAX_TITLE_LEN: usize = 500;

/// Server-assigned task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;

    /// Accepts `12` as well as the displayed form `#12`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches('#').parse().map(TaskId)
    }
}

/// Server-assigned project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ProjectId)
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}' (expected low, medium or high)", other)),
        }
    }
}

/// A node in a project's task tree, as delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    /// Display state: children hidden. Persisted server-side.
    #[serde(default)]
    pub collapsed: bool,
    /// Nesting depth (0 = top-level)
    #[serde(default)]
    pub depth: usize,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    /// Owning project. Older servers call this `list_id`.
    #[serde(alias = "list_id")]
    pub project_id: ProjectId,
    /// Index among siblings
    #[serde(default, alias = "order_index")]
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    /// Subtasks in display order
    #[serde(default)]
    pub children: Vec<Task>,
}

impl Task {
    /// A top-level task with default fields.
    pub fn root(id: TaskId, project_id: ProjectId, title: impl Into<String>) -> Self {
        Task {
            id,
            title: title.into(),
            description: None,
            priority: Priority::Medium,
            completed: false,
            collapsed: false,
            depth: 0,
            parent_id: None,
            project_id,
            position: 0,
            created_at: None,
            children: Vec::new(),
        }
    }

    /// A child of `parent`, inheriting its project. Returns `None` when the
    /// parent already sits at `MAX_DEPTH`.
    pub fn subtask(parent: &Task, id: TaskId, title: impl Into<String>) -> Option<Self> {
        if parent.depth >= MAX_DEPTH {
            return None;
        }
        Some(Task {
            depth: parent.depth + 1,
            parent_id: Some(parent.id),
            position: u32::try_from(parent.children.len()).unwrap_or(u32::MAX),
            ..Task::root(id, parent.project_id, title)
        })
    }

    /// Whether a child may be attached to this task.
    pub fn can_have_children(&self) -> bool {
        self.depth < MAX_DEPTH
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Partial field update sent with `PUT /todos/{id}`. Absent fields are left
/// untouched on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `Some("")` clears the description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(value: bool) -> Self {
        TaskPatch {
            completed: Some(value),
            ..Default::default()
        }
    }

    pub fn collapsed(value: bool) -> Self {
        TaskPatch {
            collapsed: Some(value),
            ..Default::default()
        }
    }

    pub fn title(value: impl Into<String>) -> Self {
        TaskPatch {
            title: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
            && self.collapsed.is_none()
    }
}

/// Body of `POST /todos`, used for both top-level tasks and subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl NewTask {
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        NewTask {
            project_id,
            parent_id: None,
            title: title.into(),
            description: None,
            priority: None,
        }
    }

    pub fn under(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_server_todo_with_legacy_names() {
        let json = r#"{
            "id": 7,
            "title": "Write report",
            "description": null,
            "completed": false,
            "collapsed": true,
            "depth": 0,
            "priority": "high",
            "parent_id": null,
            "list_id": 3,
            "user_id": 1,
            "order_index": 4,
            "created_at": "2025-05-01T09:30:00.123456",
            "children": []
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, TaskId(7));
        assert_eq!(task.project_id, ProjectId(3));
        assert_eq!(task.position, 4);
        assert_eq!(task.priority, Priority::High);
        assert!(task.collapsed);
        assert!(task.created_at.is_some());
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let task: Task =
            serde_json::from_str(r#"{"id": 1, "title": "Bare", "project_id": 2}"#).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.depth, 0);
        assert!(task.children.is_empty());
        assert!(task.parent_id.is_none());
    }

    #[test]
    fn subtask_inherits_project_and_depth() {
        let root = Task::root(TaskId(1), ProjectId(9), "Root");
        let child = Task::subtask(&root, TaskId(2), "Child").unwrap();
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_id, Some(TaskId(1)));
        assert_eq!(child.project_id, ProjectId(9));

        let grandchild = Task::subtask(&child, TaskId(3), "Grandchild").unwrap();
        assert_eq!(grandchild.depth, 2);
        assert!(!grandchild.can_have_children());
        assert!(Task::subtask(&grandchild, TaskId(4), "Too deep").is_none());
    }

    #[test]
    fn subtask_goes_after_existing_siblings() {
        let mut root = Task::root(TaskId(1), ProjectId(9), "Root");
        for id in 2..5 {
            let child = Task::subtask(&root, TaskId(id), "Child").unwrap();
            root.children.push(child);
        }
        let positions: Vec<u32> = root.children.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = TaskPatch::completed(true);
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"completed":true}"#);
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn task_id_parses_display_form() {
        assert_eq!("#12".parse::<TaskId>().unwrap(), TaskId(12));
        assert_eq!("12".parse::<TaskId>().unwrap(), TaskId(12));
        assert_eq!(TaskId(12).to_string(), "#12");
        assert!("x".parse::<TaskId>().is_err());
    }

    #[test]
    fn priority_round_trips_through_str() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(Priority::Low.to_string(), "low");
        assert!("urgent".parse::<Priority>().is_err());
    }
}
