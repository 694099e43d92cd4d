use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::{debug, info, warn};

use super::schema::{DEFAULT_COLUMNS, SCHEMA};
use super::{DbContext, Store, StoreError};
use crate::io::feed::Journal;
use crate::model::{
    ALL_PROJECTS, Column, ColumnId, Comment, CommentId, Label, LabelId, NewTask, PriorityOption,
    Project, ProjectId, RelationType, RelationTypeId, Shift, TaskDetail, TaskId, TaskReference,
    TaskSummary, TypeOption,
};

/// VM steps between deadline checks in the progress handler
const PROGRESS_STEPS: i32 = 1_000;

const SUMMARY_SELECT: &str = "
    SELECT t.id, t.column_id, t.title, t.position, p.description, p.color, ty.description,
           EXISTS (SELECT 1 FROM task_relations r
                   JOIN relation_types rt ON rt.id = r.relation_type_id
                   WHERE r.child_id = t.id AND rt.is_blocking = 1)
    FROM tasks t
    JOIN columns c ON c.id = t.column_id
    JOIN priorities p ON p.id = t.priority_id
    JOIN types ty ON ty.id = t.type_id";

const PARENTS_SELECT: &str = "
    SELECT t.id, t.title, c.name, rt.id, rt.parent_to_child, rt.child_to_parent, rt.color, rt.is_blocking
    FROM task_relations r
    JOIN tasks t ON t.id = r.parent_id
    JOIN columns c ON c.id = t.column_id
    JOIN relation_types rt ON rt.id = r.relation_type_id
    WHERE r.child_id = ?1
    ORDER BY t.id";

const CHILDREN_SELECT: &str = "
    SELECT t.id, t.title, c.name, rt.id, rt.parent_to_child, rt.child_to_parent, rt.color, rt.is_blocking
    FROM task_relations r
    JOIN tasks t ON t.id = r.child_id
    JOIN columns c ON c.id = t.column_id
    JOIN relation_types rt ON rt.id = r.relation_type_id
    WHERE r.parent_id = ?1
    ORDER BY t.id";

/// `Store` backed by a single SQLite database file.
///
/// Every successful mutation is published to the event journal (when one is
/// attached) so other instances sharing the database can refresh.
pub struct SqliteStore {
    conn: Connection,
    journal: Option<Journal>,
    author: String,
}

/// Clears the progress handler when a call finishes, however it finishes.
struct Interrupt<'a> {
    conn: &'a Connection,
}

impl Drop for Interrupt<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        // Several instances may share the file
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        let store = Self::bootstrap(conn)?;
        info!(path = %path.display(), "opened store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        seed_default_project(&conn)?;
        Ok(SqliteStore {
            conn,
            journal: None,
            author: default_author(),
        })
    }

    /// Publish every successful mutation to `journal`.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Run `f` under the deadline and cancellation flag of `ctx`.
    fn call<T>(
        &self,
        ctx: &DbContext,
        op: &'static str,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        ctx.check()?;
        let deadline = ctx.deadline();
        let cancel = ctx.cancel_token().clone();
        self.conn.progress_handler(
            PROGRESS_STEPS,
            Some(move || cancel.is_cancelled() || Instant::now() >= deadline),
        );
        let _interrupt = Interrupt { conn: &self.conn };
        self.conn
            .busy_timeout(deadline.saturating_duration_since(Instant::now()))?;

        f(&self.conn).map_err(|err| {
            let err = classify(ctx, err);
            debug!(op, error = %err, "store call failed");
            err
        })
    }

    fn publish(&self, project_id: ProjectId, payload: &str) {
        if let Some(journal) = &self.journal
            && let Err(err) = journal.publish_refresh(project_id, payload)
        {
            warn!(error = %err, payload, "failed to publish change to event journal");
        }
    }
}

/// Interrupted statements become Timeout/Cancelled; a busy database past its
/// timeout is a Timeout too.
fn classify(ctx: &DbContext, err: StoreError) -> StoreError {
    match err {
        StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::OperationInterrupted =>
        {
            if ctx.is_cancelled() {
                StoreError::Cancelled
            } else {
                StoreError::Timeout
            }
        }
        StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::DatabaseBusy =>
        {
            StoreError::Timeout
        }
        other => other,
    }
}

fn default_author() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}

fn seed_default_project(conn: &Connection) -> Result<(), StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO projects (name, description, created_at) VALUES (?1, ?2, ?3)",
        params!["Default", "", Utc::now()],
    )?;
    let project_id = tx.last_insert_rowid();
    for name in DEFAULT_COLUMNS {
        insert_column(&tx, project_id, name, None)?;
    }
    tx.commit()?;
    debug!(project_id, "seeded default project");
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn column_from_row(row: &Row<'_>) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        prev_id: row.get(3)?,
        next_id: row.get(4)?,
    })
}

fn label_from_row(row: &Row<'_>) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
    })
}

fn relation_type_at(row: &Row<'_>, base: usize) -> rusqlite::Result<RelationType> {
    Ok(RelationType {
        id: row.get(base)?,
        parent_to_child: row.get(base + 1)?,
        child_to_parent: row.get(base + 2)?,
        color: row.get(base + 3)?,
        is_blocking: row.get(base + 4)?,
    })
}

fn reference_from_row(row: &Row<'_>) -> rusqlite::Result<TaskReference> {
    Ok(TaskReference {
        id: row.get(0)?,
        title: row.get(1)?,
        column_name: row.get(2)?,
        relation_type: relation_type_at(row, 3)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        message: row.get(2)?,
        author: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn position_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    let raw: i64 = row.get(idx)?;
    Ok(usize::try_from(raw).unwrap_or(0))
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<TaskSummary> {
    Ok(TaskSummary {
        id: row.get(0)?,
        column_id: row.get(1)?,
        title: row.get(2)?,
        position: position_at(row, 3)?,
        labels: Vec::new(),
        priority: row.get(4)?,
        priority_color: row.get(5)?,
        task_type: row.get(6)?,
        is_blocked: row.get(7)?,
    })
}

// ---------------------------------------------------------------------------
// Shared queries
// ---------------------------------------------------------------------------

fn task_labels(conn: &Connection, task_id: TaskId) -> Result<Vec<Label>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT l.id, l.project_id, l.name, l.color
         FROM task_labels tl JOIN labels l ON l.id = tl.label_id
         WHERE tl.task_id = ?1
         ORDER BY l.name COLLATE NOCASE",
    )?;
    let labels = stmt
        .query_map([task_id], label_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(labels)
}

fn fill_labels(conn: &Connection, summaries: &mut [TaskSummary]) -> Result<(), StoreError> {
    for summary in summaries.iter_mut() {
        summary.labels = task_labels(conn, summary.id)?;
    }
    Ok(())
}

fn project_of_task(conn: &Connection, task_id: TaskId) -> Result<ProjectId, StoreError> {
    conn.query_row(
        "SELECT c.project_id FROM tasks t JOIN columns c ON c.id = t.column_id WHERE t.id = ?1",
        [task_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(StoreError::NotFound {
        entity: "task",
        id: task_id,
    })
}

fn project_of_column(conn: &Connection, column_id: ColumnId) -> Result<ProjectId, StoreError> {
    conn.query_row(
        "SELECT project_id FROM columns WHERE id = ?1",
        [column_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(StoreError::NotFound {
        entity: "column",
        id: column_id,
    })
}

/// (column_id, position) of a task
fn task_slot(conn: &Connection, task_id: TaskId) -> Result<(ColumnId, i64), StoreError> {
    conn.query_row(
        "SELECT column_id, position FROM tasks WHERE id = ?1",
        [task_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?
    .ok_or(StoreError::NotFound {
        entity: "task",
        id: task_id,
    })
}

fn column_len(conn: &Connection, column_id: ColumnId) -> Result<i64, StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE column_id = ?1",
        [column_id],
        |row| row.get(0),
    )?)
}

/// Rewrite positions in a column to 0..n-1, keeping their relative order.
fn renumber(conn: &Connection, column_id: ColumnId) -> Result<(), StoreError> {
    let ids: Vec<TaskId> = {
        let mut stmt =
            conn.prepare("SELECT id FROM tasks WHERE column_id = ?1 ORDER BY position, id")?;
        stmt.query_map([column_id], |row| row.get(0))?
            .collect::<Result<_, _>>()?
    };
    for (pos, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE tasks SET position = ?1 WHERE id = ?2",
            params![pos as i64, id],
        )?;
    }
    Ok(())
}

/// Link a new column in after `after`, or at the tail when `after` is None.
fn insert_column(
    conn: &Connection,
    project_id: ProjectId,
    name: &str,
    after: Option<ColumnId>,
) -> Result<Column, StoreError> {
    let (prev_id, next_id) = match after {
        Some(after_id) => {
            let next: Option<Option<ColumnId>> = conn
                .query_row(
                    "SELECT next_id FROM columns WHERE id = ?1 AND project_id = ?2",
                    params![after_id, project_id],
                    |row| row.get(0),
                )
                .optional()?;
            let next = next.ok_or(StoreError::NotFound {
                entity: "column",
                id: after_id,
            })?;
            (Some(after_id), next)
        }
        None => {
            let tail: Option<ColumnId> = conn
                .query_row(
                    "SELECT id FROM columns WHERE project_id = ?1 AND next_id IS NULL",
                    [project_id],
                    |row| row.get(0),
                )
                .optional()?;
            (tail, None)
        }
    };

    conn.execute(
        "INSERT INTO columns (project_id, name, prev_id, next_id) VALUES (?1, ?2, ?3, ?4)",
        params![project_id, name, prev_id, next_id],
    )?;
    let id = conn.last_insert_rowid();
    if let Some(prev) = prev_id {
        conn.execute(
            "UPDATE columns SET next_id = ?1 WHERE id = ?2",
            params![id, prev],
        )?;
    }
    if let Some(next) = next_id {
        conn.execute(
            "UPDATE columns SET prev_id = ?1 WHERE id = ?2",
            params![id, next],
        )?;
    }
    Ok(Column {
        id,
        project_id,
        name: name.to_string(),
        prev_id,
        next_id,
    })
}

/// Walk the prev/next links from the head. Columns the walk cannot reach
/// (broken links) follow in id order so nothing disappears from the board.
fn link_order(columns: Vec<Column>) -> Vec<Column> {
    let mut cursor = columns.iter().find(|c| c.prev_id.is_none()).map(|c| c.id);
    let mut by_id: HashMap<ColumnId, Column> = columns.into_iter().map(|c| (c.id, c)).collect();
    let mut ordered = Vec::with_capacity(by_id.len());
    while let Some(id) = cursor {
        match by_id.remove(&id) {
            Some(col) => {
                cursor = col.next_id;
                ordered.push(col);
            }
            None => break,
        }
    }
    let mut rest: Vec<Column> = by_id.into_values().collect();
    rest.sort_by_key(|c| c.id);
    ordered.extend(rest);
    ordered
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    let query = search.map(str::trim).filter(|q| !q.is_empty())?;
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

fn require_text(value: &str, what: &str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Invalid(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn expect_changed(changed: usize, entity: &'static str, id: i64) -> Result<(), StoreError> {
    if changed == 0 {
        Err(StoreError::NotFound { entity, id })
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store implementation
// ---------------------------------------------------------------------------

impl Store for SqliteStore {
    fn list_projects(&self, ctx: &DbContext) -> Result<Vec<Project>, StoreError> {
        self.call(ctx, "list_projects", |conn| {
            let mut stmt = conn.prepare("SELECT id, name, description FROM projects ORDER BY id")?;
            let projects = stmt
                .query_map([], project_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(projects)
        })
    }

    fn create_project(
        &self,
        ctx: &DbContext,
        name: &str,
        description: &str,
    ) -> Result<Project, StoreError> {
        let project = self.call(ctx, "create_project", |conn| {
            let name = require_text(name, "project name")?;
            conn.execute(
                "INSERT INTO projects (name, description, created_at) VALUES (?1, ?2, ?3)",
                params![name, description, Utc::now()],
            )?;
            Ok(Project {
                id: conn.last_insert_rowid(),
                name,
                description: description.to_string(),
            })
        })?;
        self.publish(ALL_PROJECTS, "project.created");
        Ok(project)
    }

    fn update_project(
        &self,
        ctx: &DbContext,
        id: ProjectId,
        name: &str,
        description: &str,
    ) -> Result<(), StoreError> {
        self.call(ctx, "update_project", |conn| {
            let name = require_text(name, "project name")?;
            let changed = conn.execute(
                "UPDATE projects SET name = ?1, description = ?2 WHERE id = ?3",
                params![name, description, id],
            )?;
            expect_changed(changed, "project", id)
        })?;
        self.publish(ALL_PROJECTS, "project.updated");
        Ok(())
    }

    fn list_columns(
        &self,
        ctx: &DbContext,
        project_id: ProjectId,
    ) -> Result<Vec<Column>, StoreError> {
        self.call(ctx, "list_columns", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, project_id, name, prev_id, next_id FROM columns WHERE project_id = ?1",
            )?;
            let columns = stmt
                .query_map([project_id], column_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(link_order(columns))
        })
    }

    fn create_column(
        &self,
        ctx: &DbContext,
        project_id: ProjectId,
        name: &str,
        after: Option<ColumnId>,
    ) -> Result<Column, StoreError> {
        let column = self.call(ctx, "create_column", |conn| {
            let name = require_text(name, "column name")?;
            let tx = conn.unchecked_transaction()?;
            let column = insert_column(&tx, project_id, &name, after)?;
            tx.commit()?;
            Ok(column)
        })?;
        self.publish(project_id, "column.created");
        Ok(column)
    }

    fn rename_column(&self, ctx: &DbContext, id: ColumnId, name: &str) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "rename_column", |conn| {
            let name = require_text(name, "column name")?;
            let changed = conn.execute(
                "UPDATE columns SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
            expect_changed(changed, "column", id)?;
            project_of_column(conn, id)
        })?;
        self.publish(project_id, "column.renamed");
        Ok(())
    }

    fn delete_column(&self, ctx: &DbContext, id: ColumnId) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "delete_column", |conn| {
            let tx = conn.unchecked_transaction()?;
            let (project_id, prev, next): (ProjectId, Option<ColumnId>, Option<ColumnId>) = tx
                .query_row(
                    "SELECT project_id, prev_id, next_id FROM columns WHERE id = ?1",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?
                .ok_or(StoreError::NotFound {
                    entity: "column",
                    id,
                })?;
            if let Some(prev) = prev {
                tx.execute(
                    "UPDATE columns SET next_id = ?1 WHERE id = ?2",
                    params![next, prev],
                )?;
            }
            if let Some(next) = next {
                tx.execute(
                    "UPDATE columns SET prev_id = ?1 WHERE id = ?2",
                    params![prev, next],
                )?;
            }
            tx.execute("DELETE FROM tasks WHERE column_id = ?1", [id])?;
            tx.execute("DELETE FROM columns WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(project_id)
        })?;
        self.publish(project_id, "column.deleted");
        Ok(())
    }

    fn list_task_summaries(
        &self,
        ctx: &DbContext,
        project_id: ProjectId,
        search: Option<&str>,
    ) -> Result<HashMap<ColumnId, Vec<TaskSummary>>, StoreError> {
        self.call(ctx, "list_task_summaries", |conn| {
            let pattern = like_pattern(search);
            let sql = format!(
                "{SUMMARY_SELECT}
                 WHERE c.project_id = ?1
                   AND (?2 IS NULL OR t.title LIKE ?2 ESCAPE '\\' OR t.description LIKE ?2 ESCAPE '\\')
                 ORDER BY t.column_id, t.position"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut summaries = stmt
                .query_map(params![project_id, pattern], summary_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            fill_labels(conn, &mut summaries)?;

            let mut by_column: HashMap<ColumnId, Vec<TaskSummary>> = HashMap::new();
            let mut col_stmt = conn.prepare("SELECT id FROM columns WHERE project_id = ?1")?;
            for column_id in col_stmt.query_map([project_id], |row| row.get::<_, ColumnId>(0))? {
                by_column.entry(column_id?).or_default();
            }
            for summary in summaries {
                by_column.entry(summary.column_id).or_default().push(summary);
            }
            Ok(by_column)
        })
    }

    fn list_column_summaries(
        &self,
        ctx: &DbContext,
        column_id: ColumnId,
    ) -> Result<Vec<TaskSummary>, StoreError> {
        self.call(ctx, "list_column_summaries", |conn| {
            let sql = format!("{SUMMARY_SELECT} WHERE t.column_id = ?1 ORDER BY t.position");
            let mut stmt = conn.prepare(&sql)?;
            let mut summaries = stmt
                .query_map([column_id], summary_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            fill_labels(conn, &mut summaries)?;
            Ok(summaries)
        })
    }

    fn get_task_summary(&self, ctx: &DbContext, id: TaskId) -> Result<TaskSummary, StoreError> {
        self.call(ctx, "get_task_summary", |conn| {
            let sql = format!("{SUMMARY_SELECT} WHERE t.id = ?1");
            let mut summary = conn
                .query_row(&sql, [id], summary_from_row)
                .optional()?
                .ok_or(StoreError::NotFound { entity: "task", id })?;
            summary.labels = task_labels(conn, id)?;
            Ok(summary)
        })
    }

    fn get_task_detail(&self, ctx: &DbContext, id: TaskId) -> Result<TaskDetail, StoreError> {
        self.call(ctx, "get_task_detail", |conn| load_detail(conn, id))
    }

    fn create_task(&self, ctx: &DbContext, task: &NewTask) -> Result<TaskDetail, StoreError> {
        let detail = self.call(ctx, "create_task", |conn| {
            let title = require_text(&task.title, "task title")?;
            let tx = conn.unchecked_transaction()?;
            project_of_column(&tx, task.column_id)?;
            let position = column_len(&tx, task.column_id)?;
            let now = Utc::now();
            tx.execute(
                "INSERT INTO tasks (column_id, title, description, position, priority_id, type_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    task.column_id,
                    title,
                    task.description,
                    position,
                    task.priority_id,
                    task.type_id,
                    now
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            load_detail(conn, id)
        })?;
        self.publish(detail.project_id, "task.created");
        Ok(detail)
    }

    fn update_task(
        &self,
        ctx: &DbContext,
        id: TaskId,
        title: &str,
        description: &str,
    ) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "update_task", |conn| {
            let title = require_text(title, "task title")?;
            let changed = conn.execute(
                "UPDATE tasks SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![title, description, Utc::now(), id],
            )?;
            expect_changed(changed, "task", id)?;
            project_of_task(conn, id)
        })?;
        self.publish(project_id, "task.updated");
        Ok(())
    }

    fn update_task_priority(
        &self,
        ctx: &DbContext,
        id: TaskId,
        priority_id: i64,
    ) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "update_task_priority", |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET priority_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![priority_id, Utc::now(), id],
            )?;
            expect_changed(changed, "task", id)?;
            project_of_task(conn, id)
        })?;
        self.publish(project_id, "task.priority");
        Ok(())
    }

    fn update_task_type(
        &self,
        ctx: &DbContext,
        id: TaskId,
        type_id: i64,
    ) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "update_task_type", |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET type_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![type_id, Utc::now(), id],
            )?;
            expect_changed(changed, "task", id)?;
            project_of_task(conn, id)
        })?;
        self.publish(project_id, "task.type");
        Ok(())
    }

    fn move_task(
        &self,
        ctx: &DbContext,
        id: TaskId,
        column_id: ColumnId,
    ) -> Result<(), StoreError> {
        let moved = self.call(ctx, "move_task", |conn| {
            let tx = conn.unchecked_transaction()?;
            let (from, _) = task_slot(&tx, id)?;
            if from == column_id {
                return Ok(None);
            }
            let project_id = project_of_column(&tx, column_id)?;
            let position = column_len(&tx, column_id)?;
            tx.execute(
                "UPDATE tasks SET column_id = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
                params![column_id, position, Utc::now(), id],
            )?;
            renumber(&tx, from)?;
            tx.commit()?;
            Ok(Some(project_id))
        })?;
        if let Some(project_id) = moved {
            self.publish(project_id, "task.moved");
        }
        Ok(())
    }

    fn shift_task(&self, ctx: &DbContext, id: TaskId, shift: Shift) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "shift_task", |conn| {
            let tx = conn.unchecked_transaction()?;
            let (column_id, position) = task_slot(&tx, id)?;
            let target = match shift {
                Shift::Up => position - 1,
                Shift::Down => position + 1,
            };
            let neighbour: Option<TaskId> = tx
                .query_row(
                    "SELECT id FROM tasks WHERE column_id = ?1 AND position = ?2",
                    params![column_id, target],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(neighbour) = neighbour else {
                let edge = match shift {
                    Shift::Up => "top",
                    Shift::Down => "bottom",
                };
                return Err(StoreError::Invalid(format!(
                    "task is already at the {edge} of its column"
                )));
            };
            tx.execute(
                "UPDATE tasks SET position = ?1 WHERE id = ?2",
                params![position, neighbour],
            )?;
            tx.execute(
                "UPDATE tasks SET position = ?1 WHERE id = ?2",
                params![target, id],
            )?;
            tx.commit()?;
            project_of_column(conn, column_id)
        })?;
        self.publish(project_id, "task.reordered");
        Ok(())
    }

    fn delete_task(&self, ctx: &DbContext, id: TaskId) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "delete_task", |conn| {
            let tx = conn.unchecked_transaction()?;
            let project_id = project_of_task(&tx, id)?;
            let (column_id, _) = task_slot(&tx, id)?;
            tx.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
            renumber(&tx, column_id)?;
            tx.commit()?;
            Ok(project_id)
        })?;
        self.publish(project_id, "task.deleted");
        Ok(())
    }

    fn list_labels(&self, ctx: &DbContext, project_id: ProjectId) -> Result<Vec<Label>, StoreError> {
        self.call(ctx, "list_labels", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, project_id, name, color FROM labels
                 WHERE project_id = ?1 ORDER BY name COLLATE NOCASE",
            )?;
            let labels = stmt
                .query_map([project_id], label_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(labels)
        })
    }

    fn create_label(
        &self,
        ctx: &DbContext,
        project_id: ProjectId,
        name: &str,
        color: &str,
    ) -> Result<Label, StoreError> {
        let label = self.call(ctx, "create_label", |conn| {
            let name = require_text(name, "label name")?;
            let exists: Option<LabelId> = conn
                .query_row(
                    "SELECT id FROM labels WHERE project_id = ?1 AND name = ?2 COLLATE NOCASE",
                    params![project_id, name],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Err(StoreError::Invalid(format!("label \"{name}\" already exists")));
            }
            conn.execute(
                "INSERT INTO labels (project_id, name, color) VALUES (?1, ?2, ?3)",
                params![project_id, name, color],
            )?;
            Ok(Label {
                id: conn.last_insert_rowid(),
                project_id,
                name,
                color: color.to_string(),
            })
        })?;
        self.publish(project_id, "label.created");
        Ok(label)
    }

    fn attach_label(
        &self,
        ctx: &DbContext,
        task_id: TaskId,
        label_id: LabelId,
    ) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "attach_label", |conn| {
            let project_id = project_of_task(conn, task_id)?;
            conn.execute(
                "INSERT OR IGNORE INTO task_labels (task_id, label_id) VALUES (?1, ?2)",
                params![task_id, label_id],
            )?;
            Ok(project_id)
        })?;
        self.publish(project_id, "label.attached");
        Ok(())
    }

    fn detach_label(
        &self,
        ctx: &DbContext,
        task_id: TaskId,
        label_id: LabelId,
    ) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "detach_label", |conn| {
            let project_id = project_of_task(conn, task_id)?;
            conn.execute(
                "DELETE FROM task_labels WHERE task_id = ?1 AND label_id = ?2",
                params![task_id, label_id],
            )?;
            Ok(project_id)
        })?;
        self.publish(project_id, "label.detached");
        Ok(())
    }

    fn list_parents(
        &self,
        ctx: &DbContext,
        task_id: TaskId,
    ) -> Result<Vec<TaskReference>, StoreError> {
        self.call(ctx, "list_parents", |conn| {
            let mut stmt = conn.prepare_cached(PARENTS_SELECT)?;
            let refs = stmt
                .query_map([task_id], reference_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(refs)
        })
    }

    fn list_children(
        &self,
        ctx: &DbContext,
        task_id: TaskId,
    ) -> Result<Vec<TaskReference>, StoreError> {
        self.call(ctx, "list_children", |conn| {
            let mut stmt = conn.prepare_cached(CHILDREN_SELECT)?;
            let refs = stmt
                .query_map([task_id], reference_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(refs)
        })
    }

    fn add_relation(
        &self,
        ctx: &DbContext,
        parent_id: TaskId,
        child_id: TaskId,
        relation_type_id: RelationTypeId,
    ) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "add_relation", |conn| {
            if parent_id == child_id {
                return Err(StoreError::Invalid(
                    "a task cannot be related to itself".to_string(),
                ));
            }
            project_of_task(conn, parent_id)?;
            let project_id = project_of_task(conn, child_id)?;
            conn.execute(
                "INSERT INTO task_relations (parent_id, child_id, relation_type_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT (parent_id, child_id) DO UPDATE SET relation_type_id = excluded.relation_type_id",
                params![parent_id, child_id, relation_type_id],
            )?;
            Ok(project_id)
        })?;
        self.publish(project_id, "relation.added");
        Ok(())
    }

    fn remove_relation(
        &self,
        ctx: &DbContext,
        parent_id: TaskId,
        child_id: TaskId,
    ) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "remove_relation", |conn| {
            let project_id = project_of_task(conn, child_id)?;
            conn.execute(
                "DELETE FROM task_relations WHERE parent_id = ?1 AND child_id = ?2",
                params![parent_id, child_id],
            )?;
            Ok(project_id)
        })?;
        self.publish(project_id, "relation.removed");
        Ok(())
    }

    fn list_relation_types(&self, ctx: &DbContext) -> Result<Vec<RelationType>, StoreError> {
        self.call(ctx, "list_relation_types", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, parent_to_child, child_to_parent, color, is_blocking
                 FROM relation_types ORDER BY id",
            )?;
            let types = stmt
                .query_map([], |row| relation_type_at(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(types)
        })
    }

    fn list_priorities(&self, ctx: &DbContext) -> Result<Vec<PriorityOption>, StoreError> {
        self.call(ctx, "list_priorities", |conn| {
            let mut stmt =
                conn.prepare("SELECT id, description, color FROM priorities ORDER BY id")?;
            let priorities = stmt
                .query_map([], |row| {
                    Ok(PriorityOption {
                        id: row.get(0)?,
                        description: row.get(1)?,
                        color: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(priorities)
        })
    }

    fn list_types(&self, ctx: &DbContext) -> Result<Vec<TypeOption>, StoreError> {
        self.call(ctx, "list_types", |conn| {
            let mut stmt = conn.prepare("SELECT id, description FROM types ORDER BY id")?;
            let types = stmt
                .query_map([], |row| {
                    Ok(TypeOption {
                        id: row.get(0)?,
                        description: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(types)
        })
    }

    fn list_comments(&self, ctx: &DbContext, task_id: TaskId) -> Result<Vec<Comment>, StoreError> {
        self.call(ctx, "list_comments", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, message, author, created_at FROM comments
                 WHERE task_id = ?1 ORDER BY created_at, id",
            )?;
            let comments = stmt
                .query_map([task_id], comment_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(comments)
        })
    }

    fn create_comment(
        &self,
        ctx: &DbContext,
        task_id: TaskId,
        message: &str,
    ) -> Result<Comment, StoreError> {
        let (comment, project_id) = self.call(ctx, "create_comment", |conn| {
            let message = require_text(message, "comment")?;
            let project_id = project_of_task(conn, task_id)?;
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO comments (task_id, message, author, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![task_id, message, self.author, created_at],
            )?;
            let comment = Comment {
                id: conn.last_insert_rowid(),
                task_id,
                message,
                author: self.author.clone(),
                created_at,
            };
            Ok((comment, project_id))
        })?;
        self.publish(project_id, "comment.created");
        Ok(comment)
    }

    fn update_comment(
        &self,
        ctx: &DbContext,
        id: CommentId,
        message: &str,
    ) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "update_comment", |conn| {
            let message = require_text(message, "comment")?;
            let task_id: TaskId = conn
                .query_row("SELECT task_id FROM comments WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?
                .ok_or(StoreError::NotFound {
                    entity: "comment",
                    id,
                })?;
            conn.execute(
                "UPDATE comments SET message = ?1 WHERE id = ?2",
                params![message, id],
            )?;
            project_of_task(conn, task_id)
        })?;
        self.publish(project_id, "comment.updated");
        Ok(())
    }

    fn delete_comment(&self, ctx: &DbContext, id: CommentId) -> Result<(), StoreError> {
        let project_id = self.call(ctx, "delete_comment", |conn| {
            let task_id: TaskId = conn
                .query_row("SELECT task_id FROM comments WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?
                .ok_or(StoreError::NotFound {
                    entity: "comment",
                    id,
                })?;
            let project_id = project_of_task(conn, task_id)?;
            conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(project_id)
        })?;
        self.publish(project_id, "comment.deleted");
        Ok(())
    }
}

fn load_detail(conn: &Connection, id: TaskId) -> Result<TaskDetail, StoreError> {
    let mut detail = conn
        .query_row(
            "SELECT t.id, c.project_id, t.column_id, c.name, t.title, t.description, t.position,
                    t.priority_id, p.description, t.type_id, ty.description, t.created_at, t.updated_at
             FROM tasks t
             JOIN columns c ON c.id = t.column_id
             JOIN priorities p ON p.id = t.priority_id
             JOIN types ty ON ty.id = t.type_id
             WHERE t.id = ?1",
            [id],
            |row| {
                Ok(TaskDetail {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    column_id: row.get(2)?,
                    column_name: row.get(3)?,
                    title: row.get(4)?,
                    description: row.get(5)?,
                    position: position_at(row, 6)?,
                    priority_id: row.get(7)?,
                    priority: row.get(8)?,
                    type_id: row.get(9)?,
                    task_type: row.get(10)?,
                    labels: Vec::new(),
                    created_at: row.get(11)?,
                    updated_at: row.get(12)?,
                })
            },
        )
        .optional()?
        .ok_or(StoreError::NotFound { entity: "task", id })?;
    detail.labels = task_labels(conn, id)?;
    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CancelToken;
    use crate::store::schema::{DEFAULT_PRIORITY, DEFAULT_TYPE};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn ctx() -> DbContext {
        DbContext::new(Duration::from_secs(5), &CancelToken::new())
    }

    fn empty_project(store: &SqliteStore) -> ProjectId {
        store.create_project(&ctx(), "Test", "").unwrap().id
    }

    fn new_task(column_id: ColumnId, title: &str) -> NewTask {
        NewTask {
            column_id,
            title: title.to_string(),
            description: String::new(),
            priority_id: DEFAULT_PRIORITY,
            type_id: DEFAULT_TYPE,
        }
    }

    fn titles(store: &SqliteStore, column_id: ColumnId) -> Vec<(String, usize)> {
        store
            .list_column_summaries(&ctx(), column_id)
            .unwrap()
            .into_iter()
            .map(|t| (t.title, t.position))
            .collect()
    }

    #[test]
    fn seeds_default_project_with_columns() {
        let store = SqliteStore::open_in_memory().unwrap();
        let projects = store.list_projects(&ctx()).unwrap();
        assert_eq!(projects.len(), 1);
        let names: Vec<String> = store
            .list_columns(&ctx(), projects[0].id)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Todo", "In Progress", "Done"]);
        assert_eq!(store.list_priorities(&ctx()).unwrap().len(), 5);
        assert_eq!(store.list_types(&ctx()).unwrap().len(), 3);
        assert!(
            store
                .list_relation_types(&ctx())
                .unwrap()
                .iter()
                .any(|t| t.is_blocking)
        );
    }

    #[test]
    fn create_column_after_relinks_neighbours() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let a = store.create_column(&ctx(), p, "A", None).unwrap();
        let c = store.create_column(&ctx(), p, "C", None).unwrap();
        let b = store.create_column(&ctx(), p, "B", Some(a.id)).unwrap();

        let cols = store.list_columns(&ctx(), p).unwrap();
        let names: Vec<&str> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(cols[1].prev_id, Some(a.id));
        assert_eq!(cols[1].next_id, Some(c.id));
        assert_eq!(cols[2].prev_id, Some(b.id));
    }

    #[test]
    fn delete_column_closes_the_gap_and_drops_tasks() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let a = store.create_column(&ctx(), p, "A", None).unwrap();
        let b = store.create_column(&ctx(), p, "B", None).unwrap();
        let c = store.create_column(&ctx(), p, "C", None).unwrap();
        let t = store.create_task(&ctx(), &new_task(b.id, "doomed")).unwrap();

        store.delete_column(&ctx(), b.id).unwrap();

        let cols = store.list_columns(&ctx(), p).unwrap();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].next_id, Some(c.id));
        assert_eq!(cols[1].prev_id, Some(a.id));
        assert!(matches!(
            store.get_task_detail(&ctx(), t.id),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn positions_stay_dense_after_move_and_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let todo = store.create_column(&ctx(), p, "Todo", None).unwrap();
        let done = store.create_column(&ctx(), p, "Done", None).unwrap();
        let a = store.create_task(&ctx(), &new_task(todo.id, "a")).unwrap();
        let b = store.create_task(&ctx(), &new_task(todo.id, "b")).unwrap();
        store.create_task(&ctx(), &new_task(todo.id, "c")).unwrap();

        store.move_task(&ctx(), a.id, done.id).unwrap();
        assert_eq!(
            titles(&store, todo.id),
            vec![("b".to_string(), 0), ("c".to_string(), 1)]
        );
        assert_eq!(titles(&store, done.id), vec![("a".to_string(), 0)]);

        store.delete_task(&ctx(), b.id).unwrap();
        assert_eq!(titles(&store, todo.id), vec![("c".to_string(), 0)]);
    }

    #[test]
    fn shift_swaps_with_neighbour() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let col = store.create_column(&ctx(), p, "Todo", None).unwrap();
        let a = store.create_task(&ctx(), &new_task(col.id, "a")).unwrap();
        store.create_task(&ctx(), &new_task(col.id, "b")).unwrap();

        store.shift_task(&ctx(), a.id, Shift::Down).unwrap();
        assert_eq!(
            titles(&store, col.id),
            vec![("b".to_string(), 0), ("a".to_string(), 1)]
        );
        assert!(matches!(
            store.shift_task(&ctx(), a.id, Shift::Down),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn search_filters_summaries_but_keeps_every_column() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let todo = store.create_column(&ctx(), p, "Todo", None).unwrap();
        let done = store.create_column(&ctx(), p, "Done", None).unwrap();
        store.create_task(&ctx(), &new_task(todo.id, "Write docs")).unwrap();
        store.create_task(&ctx(), &new_task(todo.id, "Fix bug")).unwrap();

        let found = store.list_task_summaries(&ctx(), p, Some("docs")).unwrap();
        assert_eq!(found[&todo.id].len(), 1);
        assert_eq!(found[&todo.id][0].title, "Write docs");
        assert!(found[&done.id].is_empty());

        let all = store.list_task_summaries(&ctx(), p, Some("  ")).unwrap();
        assert_eq!(all[&todo.id].len(), 2);
    }

    #[test]
    fn blocking_relation_marks_child_blocked() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let col = store.create_column(&ctx(), p, "Todo", None).unwrap();
        let parent = store.create_task(&ctx(), &new_task(col.id, "parent")).unwrap();
        let child = store.create_task(&ctx(), &new_task(col.id, "child")).unwrap();
        let blocking = store
            .list_relation_types(&ctx())
            .unwrap()
            .into_iter()
            .find(|t| t.is_blocking)
            .unwrap();

        store
            .add_relation(&ctx(), parent.id, child.id, blocking.id)
            .unwrap();

        assert!(store.get_task_summary(&ctx(), child.id).unwrap().is_blocked);
        assert!(!store.get_task_summary(&ctx(), parent.id).unwrap().is_blocked);
        let parents = store.list_parents(&ctx(), child.id).unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].relation_type.id, blocking.id);
        assert_eq!(store.list_children(&ctx(), parent.id).unwrap()[0].id, child.id);

        store.remove_relation(&ctx(), parent.id, child.id).unwrap();
        assert!(!store.get_task_summary(&ctx(), child.id).unwrap().is_blocked);
    }

    #[test]
    fn self_relation_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let col = store.create_column(&ctx(), p, "Todo", None).unwrap();
        let t = store.create_task(&ctx(), &new_task(col.id, "t")).unwrap();
        assert!(matches!(
            store.add_relation(&ctx(), t.id, t.id, 1),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn duplicate_label_names_are_rejected_case_insensitively() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        store.create_label(&ctx(), p, "Bug", "#FF0000").unwrap();
        assert!(matches!(
            store.create_label(&ctx(), p, " bug ", "#00FF00"),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn labels_round_trip_through_summaries() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let col = store.create_column(&ctx(), p, "Todo", None).unwrap();
        let t = store.create_task(&ctx(), &new_task(col.id, "t")).unwrap();
        let label = store.create_label(&ctx(), p, "ui", "#00FFFF").unwrap();

        store.attach_label(&ctx(), t.id, label.id).unwrap();
        assert_eq!(
            store.get_task_summary(&ctx(), t.id).unwrap().labels,
            vec![label.clone()]
        );
        store.detach_label(&ctx(), t.id, label.id).unwrap();
        assert!(store.get_task_detail(&ctx(), t.id).unwrap().labels.is_empty());
    }

    #[test]
    fn comments_crud() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let col = store.create_column(&ctx(), p, "Todo", None).unwrap();
        let t = store.create_task(&ctx(), &new_task(col.id, "t")).unwrap();

        let c = store.create_comment(&ctx(), t.id, "first").unwrap();
        store.update_comment(&ctx(), c.id, "edited").unwrap();
        let comments = store.list_comments(&ctx(), t.id).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].message, "edited");

        store.delete_comment(&ctx(), c.id).unwrap();
        assert!(store.list_comments(&ctx(), t.id).unwrap().is_empty());
        assert!(matches!(
            store.delete_comment(&ctx(), c.id),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn blank_titles_are_invalid() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = empty_project(&store);
        let col = store.create_column(&ctx(), p, "Todo", None).unwrap();
        assert!(matches!(
            store.create_task(&ctx(), &new_task(col.id, "   ")),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn runaway_statement_is_interrupted_at_deadline() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ctx = DbContext::new(Duration::from_millis(50), &CancelToken::new());
        let result = store.call(&ctx, "runaway", |conn| {
            let n: i64 = conn.query_row(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT COUNT(*) FROM c",
                [],
                |row| row.get(0),
            )?;
            Ok(n)
        });
        assert!(matches!(result, Err(StoreError::Timeout)));

        // Handler is cleared afterwards
        assert!(store.list_projects(&self::ctx()).is_ok());
    }

    #[test]
    fn cancelled_context_never_reaches_sqlite() {
        let store = SqliteStore::open_in_memory().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let ctx = DbContext::new(Duration::from_secs(5), &token);
        assert!(matches!(
            store.list_projects(&ctx),
            Err(StoreError::Cancelled)
        ));
    }
}
