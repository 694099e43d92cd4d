use crossterm::event::{KeyCode, KeyEvent};
use tracing::info;

use crate::model::{LabelId, NewTask, RelationTypeId, TaskId};
use crate::ops::labels::diff_labels;
use crate::ops::relations::{RelationSet, diff_relations, relation_set, would_create_cycle};
use crate::store::schema::{DEFAULT_PRIORITY, DEFAULT_TYPE};
use crate::store::{DbContext, Store, StoreError};
use crate::tui::app::{App, DiscardContext};
use crate::tui::form::{
    ColumnFields, CommentFields, FieldSet, FormMsg, FormSession, ProjectFields, TaskFields,
};
use crate::tui::keymap::{Action, KeyMap, Scope};
use crate::tui::mode::Mode;
use crate::tui::picker::PickerKind;

use super::*;

// ---------------------------------------------------------------------------
// Shared close path
// ---------------------------------------------------------------------------

/// Leave the current form: straight away when nothing changed, otherwise
/// through the discard confirmation.
fn close_or_confirm(app: &mut App, changed: bool, message: &str) {
    if changed {
        app.discard = Some(DiscardContext {
            source_mode: app.mode,
            message: message.to_string(),
        });
        app.mode = Mode::DiscardConfirm;
    } else {
        clear_session(app, app.mode);
    }
}

/// Drop the session owned by `mode` and leave to where that session
/// returns. Comment sessions go back to the comment list.
pub fn clear_session(app: &mut App, mode: Mode) {
    match mode {
        Mode::TaskForm | Mode::TaskFormHelpOverlay => app.task_form = None,
        Mode::ProjectForm => app.project_form = None,
        Mode::AddColumn | Mode::EditColumn | Mode::AddColumnForm | Mode::EditColumnForm => {
            app.column_form = None
        }
        Mode::CommentForm | Mode::CommentEdit => {
            app.comment_form = None;
            app.mode = if app.comments.is_some() {
                Mode::CommentsView
            } else {
                Mode::Normal
            };
            return;
        }
        _ => {}
    }
    app.mode = Mode::Normal;
}

/// Forward a key to a form session unless it is a reserved key.
/// Returns true once the form asks to be committed.
fn update_form<F: FieldSet>(
    keymap: &KeyMap,
    session: &mut FormSession<F>,
    key: KeyEvent,
) -> bool {
    if keymap.lookup(Scope::Form, key) == Some(Action::FormSave) {
        session.form.complete();
    } else {
        session.update(FormMsg::Key(key));
    }
    session.form.is_completed()
}

// ---------------------------------------------------------------------------
// Task form
// ---------------------------------------------------------------------------

/// Labels and relations as currently stored
#[derive(Debug, Default)]
struct StoredLinks {
    labels: Vec<LabelId>,
    parents: RelationSet,
    children: RelationSet,
}

fn load_links(store: &dyn Store, ctx: &DbContext, id: TaskId) -> Result<StoredLinks, StoreError> {
    let detail = store.get_task_detail(ctx, id)?;
    Ok(StoredLinks {
        labels: detail.labels.iter().map(|l| l.id).collect(),
        parents: relation_set(&store.list_parents(ctx, id)?),
        children: relation_set(&store.list_children(ctx, id)?),
    })
}

fn load_task_fields(
    store: &dyn Store,
    ctx: &DbContext,
    id: TaskId,
) -> Result<TaskFields, StoreError> {
    let detail = store.get_task_detail(ctx, id)?;
    let links = load_links(store, ctx, id)?;
    Ok(TaskFields {
        column_id: detail.column_id,
        title: detail.title,
        description: detail.description,
        labels: links.labels,
        parents: links.parents,
        children: links.children,
        priority_id: detail.priority_id,
        type_id: detail.type_id,
    })
}

pub fn open_new_task_form(app: &mut App) {
    let Some(column_id) = require_column(app) else {
        return;
    };
    let fields = TaskFields {
        column_id,
        priority_id: DEFAULT_PRIORITY,
        type_id: DEFAULT_TYPE,
        ..TaskFields::default()
    };
    app.task_form = Some(FormSession::open(0, fields, "New task"));
    app.mode = Mode::TaskForm;
}

pub fn open_edit_task_form(app: &mut App, id: TaskId) {
    let ctx = app.ctx();
    match load_task_fields(app.store(), &ctx, id) {
        Ok(fields) => {
            app.task_form = Some(FormSession::open(id, fields, "Edit task"));
            app.mode = Mode::TaskForm;
        }
        Err(err) => app.report("Failed to load task", err),
    }
}

pub fn handle_task_form(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        let changed = app.task_form.as_ref().is_some_and(|s| s.has_changes());
        close_or_confirm(app, changed, "Discard changes to this task?");
        return;
    }

    match app.keymap.lookup(Scope::Form, key) {
        Some(Action::FormLabels) => return open_form_picker(app, PickerKind::Label),
        Some(Action::FormParents) => return open_form_picker(app, PickerKind::Parent),
        Some(Action::FormChildren) => return open_form_picker(app, PickerKind::Child),
        Some(Action::FormPriority) => return open_form_picker(app, PickerKind::Priority),
        Some(Action::FormType) => return open_form_picker(app, PickerKind::Type),
        Some(Action::FormHelp) => {
            app.mode = Mode::TaskFormHelpOverlay;
            return;
        }
        _ => {}
    }

    let Some(session) = app.task_form.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    if update_form(&app.keymap, session, key) {
        commit_task_form(app);
    }
}

/// Why one label/relation step of a task commit did not happen
enum LinkProblem {
    Cycle { parent: TaskId, child: TaskId },
    Failed(&'static str, StoreError),
}

/// One create-or-update call, then label and relation diffs applied one
/// store call at a time, then a full task reload.
fn commit_task_form(app: &mut App) {
    let Some(session) = app.task_form.take() else {
        return;
    };
    app.mode = Mode::Normal;
    if session.is_blank() {
        app.notices.info("Title is empty, nothing saved");
        return;
    }

    let ctx = app.ctx();
    let task_id = match save_task(app.store(), &ctx, &session) {
        Ok(id) => id,
        Err(err) => {
            app.report("Failed to save task", err);
            return;
        }
    };
    let problems = sync_task_links(app.store(), &ctx, task_id, &session);
    for problem in problems {
        match problem {
            LinkProblem::Cycle { parent, child } => app.notices.error(format!(
                "Skipped relation {parent} → {child}: it would create a cycle"
            )),
            LinkProblem::Failed(what, err) => app.report(what, err),
        }
    }
    info!(task = task_id, created = session.is_create(), "task saved");

    if app.reload_tasks() {
        app.select_task(task_id);
    }
}

fn save_task(
    store: &dyn Store,
    ctx: &DbContext,
    session: &FormSession<TaskFields>,
) -> Result<TaskId, StoreError> {
    let fields = &session.fields;
    let title = fields.title.trim();
    if session.is_create() {
        let detail = store.create_task(
            ctx,
            &NewTask {
                column_id: fields.column_id,
                title: title.to_string(),
                description: fields.description.clone(),
                priority_id: fields.priority_id,
                type_id: fields.type_id,
            },
        )?;
        return Ok(detail.id);
    }

    let id = session.editing_id;
    store.update_task(ctx, id, title, &fields.description)?;
    let before = session.snapshot();
    if fields.priority_id != before.priority_id {
        store.update_task_priority(ctx, id, fields.priority_id)?;
    }
    if fields.type_id != before.type_id {
        store.update_task_type(ctx, id, fields.type_id)?;
    }
    Ok(id)
}

fn sync_task_links(
    store: &dyn Store,
    ctx: &DbContext,
    task_id: TaskId,
    session: &FormSession<TaskFields>,
) -> Vec<LinkProblem> {
    let mut problems = Vec::new();
    let current = if session.is_create() {
        StoredLinks::default()
    } else {
        match load_links(store, ctx, task_id) {
            Ok(links) => links,
            Err(err) => return vec![LinkProblem::Failed("Failed to load task links", err)],
        }
    };
    let wanted = &session.fields;

    let labels = diff_labels(&current.labels, &wanted.labels);
    for label in labels.attach {
        if let Err(err) = store.attach_label(ctx, task_id, label) {
            problems.push(LinkProblem::Failed("Failed to attach label", err));
        }
    }
    for label in labels.detach {
        if let Err(err) = store.detach_label(ctx, task_id, label) {
            problems.push(LinkProblem::Failed("Failed to detach label", err));
        }
    }

    let parents = diff_relations(&current.parents, &wanted.parents);
    for parent in parents.remove {
        if let Err(err) = store.remove_relation(ctx, parent, task_id) {
            problems.push(LinkProblem::Failed("Failed to remove parent", err));
        }
    }
    for (parent, ty) in parents.add {
        link(store, ctx, parent, task_id, ty, &mut problems);
    }

    let children = diff_relations(&current.children, &wanted.children);
    for child in children.remove {
        if let Err(err) = store.remove_relation(ctx, task_id, child) {
            problems.push(LinkProblem::Failed("Failed to remove child", err));
        }
    }
    for (child, ty) in children.add {
        link(store, ctx, task_id, child, ty, &mut problems);
    }
    problems
}

fn link(
    store: &dyn Store,
    ctx: &DbContext,
    parent: TaskId,
    child: TaskId,
    ty: RelationTypeId,
    problems: &mut Vec<LinkProblem>,
) {
    match would_create_cycle(store, ctx, parent, child) {
        Ok(true) => problems.push(LinkProblem::Cycle { parent, child }),
        Ok(false) => {
            if let Err(err) = store.add_relation(ctx, parent, child, ty) {
                problems.push(LinkProblem::Failed("Failed to add relation", err));
            }
        }
        Err(err) => problems.push(LinkProblem::Failed("Failed to check relations", err)),
    }
}

// ---------------------------------------------------------------------------
// Project form
// ---------------------------------------------------------------------------

pub fn open_new_project_form(app: &mut App) {
    app.project_form = Some(FormSession::open(
        0,
        ProjectFields::default(),
        "New project",
    ));
    app.mode = Mode::ProjectForm;
}

pub fn open_edit_project_form(app: &mut App) {
    let Some(project) = app.board.current_project() else {
        app.notices.info("No project open");
        return;
    };
    let fields = ProjectFields {
        name: project.name.clone(),
        description: project.description.clone(),
    };
    app.project_form = Some(FormSession::open(project.id, fields, "Edit project"));
    app.mode = Mode::ProjectForm;
}

pub fn handle_project_form(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        let changed = app.project_form.as_ref().is_some_and(|s| s.has_changes());
        close_or_confirm(app, changed, "Discard changes to this project?");
        return;
    }
    let Some(session) = app.project_form.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    if update_form(&app.keymap, session, key) {
        commit_project_form(app);
    }
}

fn commit_project_form(app: &mut App) {
    let Some(session) = app.project_form.take() else {
        return;
    };
    app.mode = Mode::Normal;
    if session.is_blank() {
        app.notices.info("Name is empty, nothing saved");
        return;
    }
    let name = session.fields.name.trim();
    let description = &session.fields.description;
    let ctx = app.ctx();

    if session.is_create() {
        match app.store().create_project(&ctx, name, description) {
            Ok(project) => {
                info!(project = project.id, "project created");
                app.reload_projects();
                app.switch_project(project.id);
            }
            Err(err) => app.report("Failed to create project", err),
        }
    } else {
        match app
            .store()
            .update_project(&ctx, session.editing_id, name, description)
        {
            Ok(()) => {
                app.reload_projects();
                app.reload_board();
            }
            Err(err) => app.report("Failed to update project", err),
        }
    }
}

// ---------------------------------------------------------------------------
// Column prompt / form
// ---------------------------------------------------------------------------

/// `mode` picks the inline prompt or the popup form
pub fn open_new_column(app: &mut App, mode: Mode) {
    if app.board.current_project().is_none() {
        app.notices.info("No project open");
        return;
    }
    let fields = ColumnFields {
        project_id: app.board.project_id,
        name: String::new(),
    };
    app.column_form = Some(FormSession::open(0, fields, "New column"));
    app.mode = mode;
}

pub fn open_edit_column(app: &mut App, mode: Mode) {
    let Some(column) = app.selected_column() else {
        app.notices.info("No column selected");
        return;
    };
    let fields = ColumnFields {
        project_id: column.project_id,
        name: column.name.clone(),
    };
    app.column_form = Some(FormSession::open(column.id, fields, "Edit column"));
    app.mode = mode;
}

pub fn handle_column_form(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        let changed = app.column_form.as_ref().is_some_and(|s| s.has_changes());
        close_or_confirm(app, changed, "Discard changes to this column?");
        return;
    }
    let Some(session) = app.column_form.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    if update_form(&app.keymap, session, key) {
        commit_column_form(app);
    }
}

/// A new column goes right after the selected one, or last on an empty
/// board.
fn commit_column_form(app: &mut App) {
    let Some(session) = app.column_form.take() else {
        return;
    };
    app.mode = Mode::Normal;
    if session.is_blank() {
        app.notices.info("Name is empty, nothing saved");
        return;
    }
    let name = session.fields.name.trim();
    let ctx = app.ctx();

    if session.is_create() {
        let after = app.selected_column().map(|c| c.id);
        match app
            .store()
            .create_column(&ctx, session.fields.project_id, name, after)
        {
            Ok(column) => {
                info!(column = column.id, "column created");
                if app.reload_board() {
                    let len = app.board.columns.len();
                    app.selection.after_structural_change(len);
                    if let Some(index) = app.board.column_index(column.id) {
                        app.selection.select_column(index, len);
                    }
                }
            }
            Err(err) => app.report("Failed to create column", err),
        }
    } else {
        match app.store().rename_column(&ctx, session.editing_id, name) {
            Ok(()) => {
                app.reload_board();
            }
            Err(err) => app.report("Failed to rename column", err),
        }
    }
}

// ---------------------------------------------------------------------------
// Comment form
// ---------------------------------------------------------------------------

pub fn open_new_comment(app: &mut App) {
    let Some(view) = app.comments.as_ref() else {
        return;
    };
    let fields = CommentFields {
        task_id: view.task_id,
        message: String::new(),
    };
    app.comment_form = Some(FormSession::open(0, fields, "New comment"));
    app.mode = Mode::CommentForm;
}

pub fn open_edit_comment(app: &mut App) {
    let Some(comment) = app.comments.as_ref().and_then(|v| v.selected()) else {
        app.notices.info("No comment selected");
        return;
    };
    let fields = CommentFields {
        task_id: comment.task_id,
        message: comment.message.clone(),
    };
    app.comment_form = Some(FormSession::open(comment.id, fields, "Edit comment"));
    app.mode = Mode::CommentEdit;
}

pub fn handle_comment_form(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        let changed = app.comment_form.as_ref().is_some_and(|s| s.has_changes());
        close_or_confirm(app, changed, "Discard this comment?");
        return;
    }
    let Some(session) = app.comment_form.as_mut() else {
        clear_session(app, Mode::CommentForm);
        return;
    };
    if update_form(&app.keymap, session, key) {
        commit_comment_form(app);
    }
}

fn commit_comment_form(app: &mut App) {
    let Some(session) = app.comment_form.take() else {
        return;
    };
    clear_session(app, Mode::CommentForm);
    if session.is_blank() {
        app.notices.info("Comment is empty, nothing saved");
        return;
    }
    let message = session.fields.message.trim();
    let ctx = app.ctx();
    let saved = if session.is_create() {
        app.store()
            .create_comment(&ctx, session.fields.task_id, message)
            .map(|_| ())
    } else {
        app.store()
            .update_comment(&ctx, session.editing_id, message)
    };
    match saved {
        Ok(()) => reload_comments(app),
        Err(err) => app.report("Failed to save comment", err),
    }
}
