use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::TaskId;

pub type CommentId = i64;

/// A free-text note attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub message: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}
