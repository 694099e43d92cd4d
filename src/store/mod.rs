//! The persistent store contract.
//!
//! Every call is synchronous, atomic, and bounded by the [`DbContext`] passed
//! in. The TUI never retries a failed call and never applies a write to its
//! cache before the store has confirmed it.

pub mod schema;
pub mod sqlite;

#[cfg(test)]
pub mod recording;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::model::{
    Column, ColumnId, Comment, CommentId, Label, LabelId, NewTask, PriorityOption, Project,
    ProjectId, RelationType, RelationTypeId, Shift, TaskDetail, TaskId, TaskReference,
    TaskSummary, TypeOption,
};

pub use sqlite::SqliteStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("store call timed out")]
    Timeout,
    #[error("store call cancelled")]
    Cancelled,
    #[error("{0}")]
    Invalid(String),
}

/// Shared shutdown flag. Cancelling it aborts in-flight store calls and makes
/// the event loop quit on its next iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounded-timeout context carried by every store call.
#[derive(Debug, Clone)]
pub struct DbContext {
    deadline: Instant,
    cancel: CancelToken,
}

impl DbContext {
    pub fn new(timeout: Duration, cancel: &CancelToken) -> Self {
        DbContext {
            deadline: Instant::now() + timeout,
            cancel: cancel.clone(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast when the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(StoreError::Timeout);
        }
        Ok(())
    }
}

/// CRUD surface the board needs from persistent storage.
pub trait Store {
    // Projects
    fn list_projects(&self, ctx: &DbContext) -> Result<Vec<Project>, StoreError>;
    fn create_project(
        &self,
        ctx: &DbContext,
        name: &str,
        description: &str,
    ) -> Result<Project, StoreError>;
    fn update_project(
        &self,
        ctx: &DbContext,
        id: ProjectId,
        name: &str,
        description: &str,
    ) -> Result<(), StoreError>;

    // Columns
    /// Columns of a project in linked-list order
    fn list_columns(&self, ctx: &DbContext, project_id: ProjectId)
    -> Result<Vec<Column>, StoreError>;
    /// Insert after `after`, or append when `after` is None
    fn create_column(
        &self,
        ctx: &DbContext,
        project_id: ProjectId,
        name: &str,
        after: Option<ColumnId>,
    ) -> Result<Column, StoreError>;
    fn rename_column(&self, ctx: &DbContext, id: ColumnId, name: &str) -> Result<(), StoreError>;
    /// Deletes the column and every task in it
    fn delete_column(&self, ctx: &DbContext, id: ColumnId) -> Result<(), StoreError>;

    // Tasks
    /// Summaries of every task in the project keyed by column, each list
    /// ordered by position. `search` filters on title/description.
    fn list_task_summaries(
        &self,
        ctx: &DbContext,
        project_id: ProjectId,
        search: Option<&str>,
    ) -> Result<HashMap<ColumnId, Vec<TaskSummary>>, StoreError>;
    fn list_column_summaries(
        &self,
        ctx: &DbContext,
        column_id: ColumnId,
    ) -> Result<Vec<TaskSummary>, StoreError>;
    fn get_task_summary(&self, ctx: &DbContext, id: TaskId) -> Result<TaskSummary, StoreError>;
    fn get_task_detail(&self, ctx: &DbContext, id: TaskId) -> Result<TaskDetail, StoreError>;
    /// Appends the task at the end of its column
    fn create_task(&self, ctx: &DbContext, task: &NewTask) -> Result<TaskDetail, StoreError>;
    fn update_task(
        &self,
        ctx: &DbContext,
        id: TaskId,
        title: &str,
        description: &str,
    ) -> Result<(), StoreError>;
    fn update_task_priority(
        &self,
        ctx: &DbContext,
        id: TaskId,
        priority_id: i64,
    ) -> Result<(), StoreError>;
    fn update_task_type(&self, ctx: &DbContext, id: TaskId, type_id: i64)
    -> Result<(), StoreError>;
    /// Moves the task to the end of `column_id`
    fn move_task(&self, ctx: &DbContext, id: TaskId, column_id: ColumnId)
    -> Result<(), StoreError>;
    /// Swaps the task with its neighbour inside the column
    fn shift_task(&self, ctx: &DbContext, id: TaskId, shift: Shift) -> Result<(), StoreError>;
    fn delete_task(&self, ctx: &DbContext, id: TaskId) -> Result<(), StoreError>;

    // Labels
    fn list_labels(&self, ctx: &DbContext, project_id: ProjectId)
    -> Result<Vec<Label>, StoreError>;
    fn create_label(
        &self,
        ctx: &DbContext,
        project_id: ProjectId,
        name: &str,
        color: &str,
    ) -> Result<Label, StoreError>;
    fn attach_label(
        &self,
        ctx: &DbContext,
        task_id: TaskId,
        label_id: LabelId,
    ) -> Result<(), StoreError>;
    fn detach_label(
        &self,
        ctx: &DbContext,
        task_id: TaskId,
        label_id: LabelId,
    ) -> Result<(), StoreError>;

    // Relations
    fn list_parents(&self, ctx: &DbContext, task_id: TaskId)
    -> Result<Vec<TaskReference>, StoreError>;
    fn list_children(
        &self,
        ctx: &DbContext,
        task_id: TaskId,
    ) -> Result<Vec<TaskReference>, StoreError>;
    fn add_relation(
        &self,
        ctx: &DbContext,
        parent_id: TaskId,
        child_id: TaskId,
        relation_type_id: RelationTypeId,
    ) -> Result<(), StoreError>;
    fn remove_relation(
        &self,
        ctx: &DbContext,
        parent_id: TaskId,
        child_id: TaskId,
    ) -> Result<(), StoreError>;
    fn list_relation_types(&self, ctx: &DbContext) -> Result<Vec<RelationType>, StoreError>;

    // Lookups
    fn list_priorities(&self, ctx: &DbContext) -> Result<Vec<PriorityOption>, StoreError>;
    fn list_types(&self, ctx: &DbContext) -> Result<Vec<TypeOption>, StoreError>;

    // Comments
    fn list_comments(&self, ctx: &DbContext, task_id: TaskId) -> Result<Vec<Comment>, StoreError>;
    fn create_comment(
        &self,
        ctx: &DbContext,
        task_id: TaskId,
        message: &str,
    ) -> Result<Comment, StoreError>;
    fn update_comment(
        &self,
        ctx: &DbContext,
        id: CommentId,
        message: &str,
    ) -> Result<(), StoreError>;
    fn delete_comment(&self, ctx: &DbContext, id: CommentId) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_passes_check() {
        let ctx = DbContext::new(Duration::from_secs(5), &CancelToken::new());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn expired_context_reports_timeout() {
        let ctx = DbContext::new(Duration::ZERO, &CancelToken::new());
        assert!(matches!(ctx.check(), Err(StoreError::Timeout)));
    }

    #[test]
    fn cancellation_wins_over_deadline() {
        let token = CancelToken::new();
        let ctx = DbContext::new(Duration::ZERO, &token);
        token.cancel();
        assert!(matches!(ctx.check(), Err(StoreError::Cancelled)));
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn cloned_tokens_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
    }
}
