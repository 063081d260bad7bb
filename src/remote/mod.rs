//! The CRUD service the engine talks to.

pub mod http;
pub mod wire;

use async_trait::async_trait;

use crate::model::{NewTask, Project, ProjectId, Task, TaskId, TaskPatch};

pub use http::HttpApi;
pub use wire::Reparent;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The server answered with a non-success status. `message` is its
    /// `{error}` text, passed through untouched.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// The request never completed.
    #[error("network failure: {0}")]
    Network(String),
    /// A success response that could not be used.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// The text to show a user.
    pub fn message(&self) -> String {
        match self {
            RemoteError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Async access to projects and their task trees.
///
/// Every call either returns the server's payload or a [`RemoteError`];
/// transport details stay behind the implementation.
#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError>;

    /// The full nested tree of `project`, root tasks in display order.
    async fn fetch_tree(&self, project: ProjectId) -> Result<Vec<Task>, RemoteError>;

    async fn create_task(&self, task: &NewTask) -> Result<Task, RemoteError>;

    /// Returns the authoritative subtree rooted at `id`.
    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, RemoteError>;

    /// Deletion cascades to descendants server-side.
    async fn delete_task(&self, id: TaskId) -> Result<(), RemoteError>;

    async fn reparent_task(&self, id: TaskId, request: &Reparent) -> Result<(), RemoteError>;
}
