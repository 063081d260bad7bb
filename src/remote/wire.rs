use serde::{Deserialize, Serialize};

use crate::model::{Project, ProjectId, Task, TaskId};

#[derive(Debug, Deserialize)]
pub struct TodosEnvelope {
    pub todos: Vec<Task>,
}

/// Create, update and reparent answers. Create adds a `message` we ignore.
#[derive(Debug, Deserialize)]
pub struct TodoEnvelope {
    pub todo: Task,
}

#[derive(Debug, Deserialize)]
pub struct ProjectsEnvelope {
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of `POST /todos/{id}/reparent`. A `null` parent means top level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reparent {
    pub new_parent_id: Option<TaskId>,
    pub new_project_id: ProjectId,
    #[serde(default)]
    pub new_order: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reparent_sends_explicit_null_parent() {
        let body = Reparent {
            new_parent_id: None,
            new_project_id: ProjectId(3),
            new_order: 0,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"new_parent_id":null,"new_project_id":3,"new_order":0}"#
        );
    }

    #[test]
    fn create_answer_ignores_message() {
        let json = r#"{"message": "Todo created", "todo": {"id": 5, "title": "New", "list_id": 1}}"#;
        let envelope: TodoEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.todo.id, TaskId(5));
    }

    #[test]
    fn nested_tree_payload() {
        let json = r#"{"todos": [
            {"id": 1, "title": "A", "list_id": 1, "depth": 0, "children": [
                {"id": 2, "title": "B", "list_id": 1, "depth": 1, "parent_id": 1, "children": []}
            ]}
        ]}"#;
        let envelope: TodosEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.todos.len(), 1);
        assert_eq!(envelope.todos[0].children[0].parent_id, Some(TaskId(1)));
    }
}
