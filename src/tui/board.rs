//! In-memory copy of the open project. Replaced wholesale by reloads or
//! patched right after a store mutation succeeds.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{
    Column, ColumnId, Label, PriorityOption, Project, ProjectId, RelationType, TaskId,
    TaskSummary, TypeOption,
};
use crate::store::{DbContext, Store, StoreError};

#[derive(Debug, Clone, Default)]
pub struct Board {
    pub projects: Vec<Project>,
    pub project_id: ProjectId,
    pub columns: Vec<Column>,
    pub tasks: HashMap<ColumnId, Vec<TaskSummary>>,
    pub labels: Vec<Label>,
    pub priorities: Vec<PriorityOption>,
    pub types: Vec<TypeOption>,
    pub relation_types: Vec<RelationType>,
    /// Active search filter applied to task listings
    pub search: Option<String>,
}

impl Board {
    pub fn current_project(&self) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == self.project_id)
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_index(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn tasks_in(&self, index: usize) -> &[TaskSummary] {
        self.columns
            .get(index)
            .and_then(|c| self.tasks.get(&c.id))
            .map_or(&[], Vec::as_slice)
    }

    pub fn task_at(&self, column: usize, task: usize) -> Option<&TaskSummary> {
        self.tasks_in(column).get(task)
    }

    pub fn find_task(&self, id: TaskId) -> Option<&TaskSummary> {
        self.tasks.values().flatten().find(|t| t.id == id)
    }

    /// Column id and list index of task `id`. Under a filter the index and
    /// the stored position differ.
    pub fn locate(&self, id: TaskId) -> Option<(ColumnId, usize)> {
        self.tasks.iter().find_map(|(column_id, list)| {
            list.iter().position(|t| t.id == id).map(|i| (*column_id, i))
        })
    }

    /// A filtered listing hides tasks, so it cannot be patched locally.
    pub fn is_filtered(&self) -> bool {
        self.search.is_some()
    }

    pub fn load_projects(&mut self, store: &dyn Store, ctx: &DbContext) -> Result<(), StoreError> {
        self.projects = store.list_projects(ctx)?;
        Ok(())
    }

    /// Priorities, types and relation types do not change at runtime.
    pub fn load_lookups(&mut self, store: &dyn Store, ctx: &DbContext) -> Result<(), StoreError> {
        let priorities = store.list_priorities(ctx)?;
        let types = store.list_types(ctx)?;
        let relation_types = store.list_relation_types(ctx)?;
        self.priorities = priorities;
        self.types = types;
        self.relation_types = relation_types;
        Ok(())
    }

    /// Columns, tasks and labels of the open project. Nothing is replaced
    /// unless every listing succeeds.
    pub fn reload(&mut self, store: &dyn Store, ctx: &DbContext) -> Result<(), StoreError> {
        let columns = store.list_columns(ctx, self.project_id)?;
        let tasks = store.list_task_summaries(ctx, self.project_id, self.search.as_deref())?;
        let labels = store.list_labels(ctx, self.project_id)?;
        debug!(
            project = self.project_id,
            columns = columns.len(),
            "board reloaded"
        );
        self.columns = columns;
        self.tasks = tasks;
        self.labels = labels;
        Ok(())
    }

    pub fn reload_tasks(&mut self, store: &dyn Store, ctx: &DbContext) -> Result<(), StoreError> {
        self.tasks = store.list_task_summaries(ctx, self.project_id, self.search.as_deref())?;
        Ok(())
    }

    pub fn reload_labels(&mut self, store: &dyn Store, ctx: &DbContext) -> Result<(), StoreError> {
        self.labels = store.list_labels(ctx, self.project_id)?;
        Ok(())
    }

    /// Put a fresh summary where it belongs: in place if it stayed in its
    /// column, otherwise removed from the old column and inserted at its
    /// position in the new one.
    pub fn place(&mut self, summary: TaskSummary) {
        if let Some(list) = self.tasks.get_mut(&summary.column_id)
            && let Some(slot) = list.iter_mut().find(|t| t.id == summary.id)
        {
            *slot = summary;
            return;
        }
        self.remove_task(summary.id);
        let list = self.tasks.entry(summary.column_id).or_default();
        let at = summary.position.min(list.len());
        list.insert(at, summary);
        renumber(list);
    }

    /// Swap two neighbours after a successful reorder.
    pub fn swap(&mut self, column_id: ColumnId, a: usize, b: usize) {
        if let Some(list) = self.tasks.get_mut(&column_id)
            && a < list.len()
            && b < list.len()
        {
            list.swap(a, b);
            renumber(list);
        }
    }

    pub fn remove_task(&mut self, id: TaskId) -> Option<TaskSummary> {
        for list in self.tasks.values_mut() {
            if let Some(i) = list.iter().position(|t| t.id == id) {
                let removed = list.remove(i);
                renumber(list);
                return Some(removed);
            }
        }
        None
    }

    /// Every task sits under its own column id. Positions are dense, or
    /// strictly increasing while a filter hides some of them.
    pub fn is_consistent(&self) -> bool {
        let filtered = self.is_filtered();
        self.tasks.iter().all(|(column_id, list)| {
            list.iter().all(|t| t.column_id == *column_id)
                && if filtered {
                    list.windows(2).all(|w| w[0].position < w[1].position)
                } else {
                    list.iter().enumerate().all(|(i, t)| t.position == i)
                }
        })
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.tasks.clear();
        self.labels.clear();
    }
}

fn renumber(list: &mut [TaskSummary]) {
    for (i, task) in list.iter_mut().enumerate() {
        task.position = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;
    use crate::store::{CancelToken, SqliteStore};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn summary(id: TaskId, column_id: ColumnId, position: usize) -> TaskSummary {
        TaskSummary {
            id,
            column_id,
            title: format!("t{id}"),
            position,
            labels: Vec::new(),
            priority: "low".into(),
            priority_color: "#FFFFFF".into(),
            task_type: "task".into(),
            is_blocked: false,
        }
    }

    fn board() -> Board {
        let mut b = Board::default();
        b.tasks.insert(1, vec![summary(10, 1, 0), summary(11, 1, 1), summary(12, 1, 2)]);
        b.tasks.insert(2, vec![summary(20, 2, 0)]);
        b
    }

    fn ids(b: &Board, column: ColumnId) -> Vec<TaskId> {
        b.tasks[&column].iter().map(|t| t.id).collect()
    }

    #[test]
    fn place_moves_between_columns() {
        let mut b = board();
        b.place(summary(11, 2, 1));
        assert_eq!(ids(&b, 1), vec![10, 12]);
        assert_eq!(ids(&b, 2), vec![20, 11]);
        assert!(b.is_consistent());
    }

    #[test]
    fn place_in_same_column_replaces() {
        let mut b = board();
        let mut s = summary(11, 1, 1);
        s.title = "renamed".into();
        b.place(s);
        assert_eq!(b.find_task(11).unwrap().title, "renamed");
        assert_eq!(ids(&b, 1), vec![10, 11, 12]);
    }

    #[test]
    fn swap_and_remove_keep_positions_dense() {
        let mut b = board();
        b.swap(1, 1, 2);
        assert_eq!(ids(&b, 1), vec![10, 12, 11]);
        assert!(b.is_consistent());
        assert_eq!(b.remove_task(10).map(|t| t.id), Some(10));
        assert_eq!(ids(&b, 1), vec![12, 11]);
        assert!(b.is_consistent());
        assert_eq!(b.remove_task(99), None);
    }

    #[test]
    fn filtered_listing_keeps_stored_positions() {
        let mut b = Board::default();
        b.search = Some("t".into());
        b.tasks.insert(1, vec![summary(10, 1, 0), summary(12, 1, 2)]);
        assert!(b.is_consistent());
        assert_eq!(b.locate(12), Some((1, 1)));
        b.tasks.insert(1, vec![summary(12, 1, 2), summary(10, 1, 0)]);
        assert!(!b.is_consistent());
    }

    #[test]
    fn reload_reads_the_open_project() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ctx = DbContext::new(Duration::from_secs(2), &CancelToken::new());
        let mut b = Board::default();
        b.load_projects(&store, &ctx).unwrap();
        b.project_id = b.projects[0].id;
        b.load_lookups(&store, &ctx).unwrap();
        b.reload(&store, &ctx).unwrap();
        assert_eq!(b.columns.len(), 3);

        let todo = b.columns[0].id;
        store
            .create_task(
                &ctx,
                &NewTask {
                    column_id: todo,
                    title: "Write spec".into(),
                    description: String::new(),
                    priority_id: 2,
                    type_id: 1,
                },
            )
            .unwrap();
        b.reload_tasks(&store, &ctx).unwrap();
        assert_eq!(b.tasks_in(0)[0].title, "Write spec");
        assert!(b.tasks_in(7).is_empty());
        assert!(b.is_consistent());
    }

    #[test]
    fn failed_reload_leaves_cache_alone() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cancel = CancelToken::new();
        let ctx = DbContext::new(Duration::from_secs(2), &cancel);
        let mut b = Board::default();
        b.load_projects(&store, &ctx).unwrap();
        b.project_id = b.projects[0].id;
        b.reload(&store, &ctx).unwrap();

        cancel.cancel();
        assert!(b.reload(&store, &ctx).is_err());
        assert_eq!(b.columns.len(), 3);
    }
}
