use serde::{Deserialize, Serialize};

pub type ProjectId = i64;

/// Sentinel project id carried by feed events that concern every project
pub const ALL_PROJECTS: ProjectId = 0;

/// A board: a named set of columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
}
