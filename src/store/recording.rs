//! Test double: forwards to a real store and records every call.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{DbContext, SqliteStore, Store, StoreError};
use crate::model::{
    Column, ColumnId, Comment, CommentId, Label, LabelId, NewTask, PriorityOption, Project,
    ProjectId, RelationType, RelationTypeId, Shift, TaskDetail, TaskId, TaskReference,
    TaskSummary, TypeOption,
};

/// Shared handle onto the recorded calls, kept by the test after the store
/// itself has been handed to the app.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    fn push(&self, call: String) {
        self.0.borrow_mut().push(call);
    }

    pub fn all(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Calls that write to the store
    pub fn mutations(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|c| !c.starts_with("list_") && !c.starts_with("get_"))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct RecordingStore {
    inner: SqliteStore,
    log: CallLog,
}

impl RecordingStore {
    pub fn new(inner: SqliteStore) -> (Self, CallLog) {
        let log = CallLog::default();
        (
            RecordingStore {
                inner,
                log: log.clone(),
            },
            log,
        )
    }
}

impl Store for RecordingStore {
    fn list_projects(&self, ctx: &DbContext) -> Result<Vec<Project>, StoreError> {
        self.log.push("list_projects".into());
        self.inner.list_projects(ctx)
    }

    fn create_project(&self, ctx: &DbContext, name: &str, description: &str) -> Result<Project, StoreError> {
        self.log.push(format!("create_project({name})"));
        self.inner.create_project(ctx, name, description)
    }

    fn update_project(&self, ctx: &DbContext, id: ProjectId, name: &str, description: &str) -> Result<(), StoreError> {
        self.log.push(format!("update_project({id}, {name})"));
        self.inner.update_project(ctx, id, name, description)
    }

    fn list_columns(&self, ctx: &DbContext, project_id: ProjectId) -> Result<Vec<Column>, StoreError> {
        self.log.push(format!("list_columns({project_id})"));
        self.inner.list_columns(ctx, project_id)
    }

    fn create_column(&self, ctx: &DbContext, project_id: ProjectId, name: &str, after: Option<ColumnId>) -> Result<Column, StoreError> {
        self.log.push(format!("create_column({name}, after={after:?})"));
        self.inner.create_column(ctx, project_id, name, after)
    }

    fn rename_column(&self, ctx: &DbContext, id: ColumnId, name: &str) -> Result<(), StoreError> {
        self.log.push(format!("rename_column({id}, {name})"));
        self.inner.rename_column(ctx, id, name)
    }

    fn delete_column(&self, ctx: &DbContext, id: ColumnId) -> Result<(), StoreError> {
        self.log.push(format!("delete_column({id})"));
        self.inner.delete_column(ctx, id)
    }

    fn list_task_summaries(&self, ctx: &DbContext, project_id: ProjectId, search: Option<&str>) -> Result<HashMap<ColumnId, Vec<TaskSummary>>, StoreError> {
        self.log.push(format!("list_task_summaries({project_id}, {search:?})"));
        self.inner.list_task_summaries(ctx, project_id, search)
    }

    fn list_column_summaries(&self, ctx: &DbContext, column_id: ColumnId) -> Result<Vec<TaskSummary>, StoreError> {
        self.log.push(format!("list_column_summaries({column_id})"));
        self.inner.list_column_summaries(ctx, column_id)
    }

    fn get_task_summary(&self, ctx: &DbContext, id: TaskId) -> Result<TaskSummary, StoreError> {
        self.log.push(format!("get_task_summary({id})"));
        self.inner.get_task_summary(ctx, id)
    }

    fn get_task_detail(&self, ctx: &DbContext, id: TaskId) -> Result<TaskDetail, StoreError> {
        self.log.push(format!("get_task_detail({id})"));
        self.inner.get_task_detail(ctx, id)
    }

    fn create_task(&self, ctx: &DbContext, task: &NewTask) -> Result<TaskDetail, StoreError> {
        self.log.push(format!("create_task({})", task.title));
        self.inner.create_task(ctx, task)
    }

    fn update_task(&self, ctx: &DbContext, id: TaskId, title: &str, description: &str) -> Result<(), StoreError> {
        self.log.push(format!("update_task({id}, {title})"));
        self.inner.update_task(ctx, id, title, description)
    }

    fn update_task_priority(&self, ctx: &DbContext, id: TaskId, priority_id: i64) -> Result<(), StoreError> {
        self.log.push(format!("update_task_priority({id}, {priority_id})"));
        self.inner.update_task_priority(ctx, id, priority_id)
    }

    fn update_task_type(&self, ctx: &DbContext, id: TaskId, type_id: i64) -> Result<(), StoreError> {
        self.log.push(format!("update_task_type({id}, {type_id})"));
        self.inner.update_task_type(ctx, id, type_id)
    }

    fn move_task(&self, ctx: &DbContext, id: TaskId, column_id: ColumnId) -> Result<(), StoreError> {
        self.log.push(format!("move_task({id}, {column_id})"));
        self.inner.move_task(ctx, id, column_id)
    }

    fn shift_task(&self, ctx: &DbContext, id: TaskId, shift: Shift) -> Result<(), StoreError> {
        self.log.push(format!("shift_task({id}, {shift:?})"));
        self.inner.shift_task(ctx, id, shift)
    }

    fn delete_task(&self, ctx: &DbContext, id: TaskId) -> Result<(), StoreError> {
        self.log.push(format!("delete_task({id})"));
        self.inner.delete_task(ctx, id)
    }

    fn list_labels(&self, ctx: &DbContext, project_id: ProjectId) -> Result<Vec<Label>, StoreError> {
        self.log.push(format!("list_labels({project_id})"));
        self.inner.list_labels(ctx, project_id)
    }

    fn create_label(&self, ctx: &DbContext, project_id: ProjectId, name: &str, color: &str) -> Result<Label, StoreError> {
        self.log.push(format!("create_label({name}, {color})"));
        self.inner.create_label(ctx, project_id, name, color)
    }

    fn attach_label(&self, ctx: &DbContext, task_id: TaskId, label_id: LabelId) -> Result<(), StoreError> {
        self.log.push(format!("attach_label({task_id}, {label_id})"));
        self.inner.attach_label(ctx, task_id, label_id)
    }

    fn detach_label(&self, ctx: &DbContext, task_id: TaskId, label_id: LabelId) -> Result<(), StoreError> {
        self.log.push(format!("detach_label({task_id}, {label_id})"));
        self.inner.detach_label(ctx, task_id, label_id)
    }

    fn list_parents(&self, ctx: &DbContext, task_id: TaskId) -> Result<Vec<TaskReference>, StoreError> {
        self.log.push(format!("list_parents({task_id})"));
        self.inner.list_parents(ctx, task_id)
    }

    fn list_children(&self, ctx: &DbContext, task_id: TaskId) -> Result<Vec<TaskReference>, StoreError> {
        self.log.push(format!("list_children({task_id})"));
        self.inner.list_children(ctx, task_id)
    }

    fn add_relation(&self, ctx: &DbContext, parent_id: TaskId, child_id: TaskId, relation_type_id: RelationTypeId) -> Result<(), StoreError> {
        self.log.push(format!("add_relation({parent_id}, {child_id}, {relation_type_id})"));
        self.inner.add_relation(ctx, parent_id, child_id, relation_type_id)
    }

    fn remove_relation(&self, ctx: &DbContext, parent_id: TaskId, child_id: TaskId) -> Result<(), StoreError> {
        self.log.push(format!("remove_relation({parent_id}, {child_id})"));
        self.inner.remove_relation(ctx, parent_id, child_id)
    }

    fn list_relation_types(&self, ctx: &DbContext) -> Result<Vec<RelationType>, StoreError> {
        self.log.push("list_relation_types".into());
        self.inner.list_relation_types(ctx)
    }

    fn list_priorities(&self, ctx: &DbContext) -> Result<Vec<PriorityOption>, StoreError> {
        self.log.push("list_priorities".into());
        self.inner.list_priorities(ctx)
    }

    fn list_types(&self, ctx: &DbContext) -> Result<Vec<TypeOption>, StoreError> {
        self.log.push("list_types".into());
        self.inner.list_types(ctx)
    }

    fn list_comments(&self, ctx: &DbContext, task_id: TaskId) -> Result<Vec<Comment>, StoreError> {
        self.log.push(format!("list_comments({task_id})"));
        self.inner.list_comments(ctx, task_id)
    }

    fn create_comment(&self, ctx: &DbContext, task_id: TaskId, message: &str) -> Result<Comment, StoreError> {
        self.log.push(format!("create_comment({task_id})"));
        self.inner.create_comment(ctx, task_id, message)
    }

    fn update_comment(&self, ctx: &DbContext, id: CommentId, message: &str) -> Result<(), StoreError> {
        self.log.push(format!("update_comment({id})"));
        self.inner.update_comment(ctx, id, message)
    }

    fn delete_comment(&self, ctx: &DbContext, id: CommentId) -> Result<(), StoreError> {
        self.log.push(format!("delete_comment({id})"));
        self.inner.delete_comment(ctx, id)
    }
}
