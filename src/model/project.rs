use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::task::ProjectId;

/// A project owns exactly one task tree. Created and deleted elsewhere; the
/// client only lists and opens projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}
