use serde::{Deserialize, Serialize};

use super::project::ProjectId;

pub type ColumnId = i64;

/// A board column. Columns of a project form a doubly linked list through
/// `prev_id` / `next_id`; the store returns them in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub project_id: ProjectId,
    pub name: String,
    pub prev_id: Option<ColumnId>,
    pub next_id: Option<ColumnId>,
}
