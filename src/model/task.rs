use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::column::ColumnId;
use super::label::{Label, RelationType};
use super::project::ProjectId;

pub type TaskId = i64;

/// A priority level a task can carry (seeded lookup table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityOption {
    pub id: i64,
    pub description: String,
    /// Display colour as `#RRGGBB`
    pub color: String,
}

/// A task type such as "feature" or "bug" (seeded lookup table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOption {
    pub id: i64,
    pub description: String,
}

/// Card-level view of a task, as shown on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub column_id: ColumnId,
    pub title: String,
    /// Dense 0..n-1 within the owning column
    pub position: usize,
    pub labels: Vec<Label>,
    pub priority: String,
    pub priority_color: String,
    pub task_type: String,
    /// True when a blocking relation names this task as its child
    pub is_blocked: bool,
}

/// Everything needed to display or edit a single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub column_id: ColumnId,
    pub column_name: String,
    pub title: String,
    pub description: String,
    pub position: usize,
    pub priority_id: i64,
    pub priority: String,
    pub type_id: i64,
    pub task_type: String,
    pub labels: Vec<Label>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task on the other end of a parent/child relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReference {
    pub id: TaskId,
    pub title: String,
    pub column_name: String,
    pub relation_type: RelationType,
}

/// Fields for a task that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub column_id: ColumnId,
    pub title: String,
    pub description: String,
    pub priority_id: i64,
    pub type_id: i64,
}

/// Direction for reordering a task inside its column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
}
