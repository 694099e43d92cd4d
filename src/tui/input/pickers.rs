use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info};

use crate::model::{DEFAULT_RELATION_TYPE, Label, LabelId, RelationTypeId, TaskId};
use crate::ops::labels::find_label_by_name;
use crate::ops::relations::{RelationSet, relation_set, would_create_cycle};
use crate::store::{DbContext, Store, StoreError};
use crate::tui::app::App;
use crate::tui::board::Board;
use crate::tui::mode::Mode;
use crate::tui::picker::{PickerItem, PickerKind, PickerRow, PickerSession, RelationTypePicker};

use super::*;

// ---------------------------------------------------------------------------
// Item builders
// ---------------------------------------------------------------------------

fn label_items(labels: &[Label], selected: &[LabelId]) -> Vec<PickerItem> {
    labels
        .iter()
        .map(|l| PickerItem {
            color: Some(l.color.clone()),
            selected: selected.contains(&l.id),
            ..PickerItem::new(l.id, &l.name)
        })
        .collect()
}

/// Every other task of the open project, column by column.
fn relation_items(
    store: &dyn Store,
    ctx: &DbContext,
    board: &Board,
    exclude: TaskId,
    selected: &RelationSet,
) -> Result<Vec<PickerItem>, StoreError> {
    let summaries = store.list_task_summaries(ctx, board.project_id, None)?;
    let mut items = Vec::new();
    for column in &board.columns {
        for task in summaries.get(&column.id).into_iter().flatten() {
            if task.id == exclude {
                continue;
            }
            let chosen = selected
                .iter()
                .find(|(id, _)| *id == task.id)
                .map(|(_, ty)| *ty);
            items.push(PickerItem {
                hint: Some(column.name.clone()),
                selected: chosen.is_some(),
                relation_type: chosen,
                ..PickerItem::new(task.id, &task.title)
            });
        }
    }
    Ok(items)
}

fn priority_items(board: &Board, current: i64) -> Vec<PickerItem> {
    board
        .priorities
        .iter()
        .map(|p| PickerItem {
            color: Some(p.color.clone()),
            selected: p.id == current,
            ..PickerItem::new(p.id, &p.description)
        })
        .collect()
}

fn type_items(board: &Board, current: i64) -> Vec<PickerItem> {
    board
        .types
        .iter()
        .map(|t| PickerItem {
            selected: t.id == current,
            ..PickerItem::new(t.id, &t.description)
        })
        .collect()
}

fn status_items(board: &Board, current: i64) -> Vec<PickerItem> {
    board
        .columns
        .iter()
        .map(|c| PickerItem {
            selected: c.id == current,
            ..PickerItem::new(c.id, &c.name)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Opening
// ---------------------------------------------------------------------------

/// Picker over the selected task; every toggle is written immediately.
pub fn open_view_picker(app: &mut App, kind: PickerKind) {
    let Some(task_id) = require_task(app) else {
        return;
    };
    let ctx = app.ctx();
    let items = match view_items(app.store(), &ctx, &app.board, kind, task_id) {
        Ok(items) => items,
        Err(err) => {
            app.report("Failed to open picker", err);
            return;
        }
    };
    app.picker = Some(PickerSession::new(kind, items, Mode::Normal, task_id));
    app.mode = kind.mode();
}

fn view_items(
    store: &dyn Store,
    ctx: &DbContext,
    board: &Board,
    kind: PickerKind,
    task_id: TaskId,
) -> Result<Vec<PickerItem>, StoreError> {
    let items = match kind {
        PickerKind::Label => {
            let detail = store.get_task_detail(ctx, task_id)?;
            let ids: Vec<LabelId> = detail.labels.iter().map(|l| l.id).collect();
            label_items(&board.labels, &ids)
        }
        PickerKind::Parent => {
            let parents = relation_set(&store.list_parents(ctx, task_id)?);
            relation_items(store, ctx, board, task_id, &parents)?
        }
        PickerKind::Child => {
            let children = relation_set(&store.list_children(ctx, task_id)?);
            relation_items(store, ctx, board, task_id, &children)?
        }
        PickerKind::Priority => {
            priority_items(board, store.get_task_detail(ctx, task_id)?.priority_id)
        }
        PickerKind::Type => type_items(board, store.get_task_detail(ctx, task_id)?.type_id),
        PickerKind::Status => status_items(board, store.get_task_detail(ctx, task_id)?.column_id),
    };
    Ok(items)
}

/// Picker over the open task form; choices are written back to the form
/// when the picker closes.
pub fn open_form_picker(app: &mut App, kind: PickerKind) {
    let Some(session) = app.task_form.as_ref() else {
        return;
    };
    let fields = &session.fields;
    let task_id = session.editing_id;
    let ctx = app.ctx();
    let items = match kind {
        PickerKind::Label => Ok(label_items(&app.board.labels, &fields.labels)),
        PickerKind::Parent => {
            relation_items(app.store(), &ctx, &app.board, task_id, &fields.parents)
        }
        PickerKind::Child => {
            relation_items(app.store(), &ctx, &app.board, task_id, &fields.children)
        }
        PickerKind::Priority => Ok(priority_items(&app.board, fields.priority_id)),
        PickerKind::Type => Ok(type_items(&app.board, fields.type_id)),
        // Column changes go through the board, not the form
        PickerKind::Status => return,
    };
    match items {
        Ok(items) => {
            app.picker = Some(PickerSession::new(kind, items, Mode::TaskForm, task_id));
            app.mode = kind.mode();
        }
        Err(err) => app.report("Failed to open picker", err),
    }
}

// ---------------------------------------------------------------------------
// Picker keys
// ---------------------------------------------------------------------------

pub fn handle_picker(app: &mut App, key: KeyEvent) {
    let Some(picker) = app.picker.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    if picker.draft.is_some() {
        handle_label_draft(app, key);
        return;
    }
    match key.code {
        KeyCode::Esc => close_picker(app),
        KeyCode::Up => picker.move_up(),
        KeyCode::Down => picker.move_down(),
        KeyCode::Backspace => picker.pop_filter(),
        KeyCode::Tab => open_relation_type_picker(app),
        KeyCode::Enter => activate(app),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            picker.push_filter(c)
        }
        _ => {}
    }
}

fn handle_label_draft(app: &mut App, key: KeyEvent) {
    let Some(picker) = app.picker.as_mut() else {
        return;
    };
    let Some(draft) = picker.draft.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => picker.draft = None,
        KeyCode::Left => draft.prev_color(),
        KeyCode::Right | KeyCode::Tab => draft.next_color(),
        KeyCode::Enter => create_label(app),
        _ => {}
    }
}

fn activate(app: &mut App) {
    let Some(picker) = app.picker.as_mut() else {
        return;
    };
    let single = picker.kind.is_single_select();
    match picker.current() {
        None => {}
        Some(PickerRow::Create) => picker.begin_create(),
        Some(PickerRow::Item(index)) if single => choose(app, index),
        Some(PickerRow::Item(index)) => toggle(app, index),
    }
}

/// Close the picker. A form-bound picker hands its selection to the form.
fn close_picker(app: &mut App) {
    let Some(picker) = app.picker.take() else {
        app.mode = Mode::Normal;
        return;
    };
    app.mode = picker.return_mode;
    if !picker.is_form_bound() {
        return;
    }
    let Some(session) = app.task_form.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    let fields = &mut session.fields;
    match picker.kind {
        PickerKind::Label => fields.labels = picker.selected_ids(),
        PickerKind::Parent => fields.parents = merge_relations(&fields.parents, &picker),
        PickerKind::Child => fields.children = merge_relations(&fields.children, &picker),
        PickerKind::Priority | PickerKind::Type | PickerKind::Status => {}
    }
}

/// Relations to tasks the picker did not list (other projects) are kept.
fn merge_relations(existing: &RelationSet, picker: &PickerSession) -> RelationSet {
    let mut merged: RelationSet = existing
        .iter()
        .filter(|(id, _)| !picker.items.iter().any(|i| i.id == *id))
        .copied()
        .collect();
    merged.extend(picker.selected_relations());
    merged
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// One immediate write made by a picker over a saved task
enum Write {
    Attach(LabelId),
    Detach(LabelId),
    Link {
        parent: TaskId,
        child: TaskId,
        ty: RelationTypeId,
    },
    Unlink {
        parent: TaskId,
        child: TaskId,
    },
    /// Change the type of an existing relation; `add_relation` upserts
    Retype {
        parent: TaskId,
        child: TaskId,
        ty: RelationTypeId,
    },
}

/// Ok(false) when a link was refused because it would close a cycle.
fn apply_write(
    store: &dyn Store,
    ctx: &DbContext,
    task_id: TaskId,
    write: &Write,
) -> Result<bool, StoreError> {
    match *write {
        Write::Attach(label) => store.attach_label(ctx, task_id, label)?,
        Write::Detach(label) => store.detach_label(ctx, task_id, label)?,
        Write::Link { parent, child, ty } => {
            if would_create_cycle(store, ctx, parent, child)? {
                return Ok(false);
            }
            store.add_relation(ctx, parent, child, ty)?;
        }
        Write::Unlink { parent, child } => store.remove_relation(ctx, parent, child)?,
        Write::Retype { parent, child, ty } => store.add_relation(ctx, parent, child, ty)?,
    }
    Ok(true)
}

/// (parent, child) for a relation between the picker's task and `other`
fn endpoints(kind: PickerKind, task_id: TaskId, other: TaskId) -> (TaskId, TaskId) {
    match kind {
        PickerKind::Parent => (other, task_id),
        _ => (task_id, other),
    }
}

/// Run a write and report the outcome. Returns true when it happened.
fn write_through(app: &mut App, task_id: TaskId, other: TaskId, write: Write) -> bool {
    let ctx = app.ctx();
    match apply_write(app.store(), &ctx, task_id, &write) {
        Ok(true) => {
            app.refresh_summary(task_id);
            // The other end's blocked flag may have changed
            if matches!(
                write,
                Write::Link { .. } | Write::Unlink { .. } | Write::Retype { .. }
            ) && app.board.find_task(other).is_some()
            {
                app.refresh_summary(other);
            }
            true
        }
        Ok(false) => {
            app.notices.error("That relation would create a cycle");
            false
        }
        Err(err) => {
            app.report("Failed to update task", err);
            false
        }
    }
}

/// Multi-select toggle. Form-bound pickers only flip the flag; otherwise the
/// store is written first and the flag follows on success.
fn toggle(app: &mut App, index: usize) {
    let Some(picker) = app.picker.as_mut() else {
        return;
    };
    if picker.is_form_bound() {
        picker.toggle(index);
        return;
    }
    let Some(item) = picker.items.get(index) else {
        return;
    };
    let (kind, task_id, other, selected) = (picker.kind, picker.task_id, item.id, item.selected);
    let (parent, child) = endpoints(kind, task_id, other);
    let write = match (kind, selected) {
        (PickerKind::Label, false) => Write::Attach(other),
        (PickerKind::Label, true) => Write::Detach(other),
        (_, false) => Write::Link {
            parent,
            child,
            ty: DEFAULT_RELATION_TYPE,
        },
        (_, true) => Write::Unlink { parent, child },
    };
    if write_through(app, task_id, other, write)
        && let Some(picker) = app.picker.as_mut()
    {
        picker.toggle(index);
    }
}

/// Single-select pick: apply and close.
fn choose(app: &mut App, index: usize) {
    let Some(picker) = app.picker.take() else {
        return;
    };
    app.mode = picker.return_mode;
    let Some(item) = picker.items.get(index) else {
        return;
    };

    if picker.is_form_bound() {
        if let Some(session) = app.task_form.as_mut() {
            match picker.kind {
                PickerKind::Priority => session.fields.priority_id = item.id,
                PickerKind::Type => session.fields.type_id = item.id,
                _ => {}
            }
        }
        return;
    }
    if item.selected {
        return;
    }

    let task_id = picker.task_id;
    let ctx = app.ctx();
    let (result, what) = match picker.kind {
        PickerKind::Priority => (
            app.store().update_task_priority(&ctx, task_id, item.id),
            "Failed to set priority",
        ),
        PickerKind::Type => (
            app.store().update_task_type(&ctx, task_id, item.id),
            "Failed to set type",
        ),
        PickerKind::Status => (
            app.store().move_task(&ctx, task_id, item.id),
            "Failed to move task",
        ),
        PickerKind::Label | PickerKind::Parent | PickerKind::Child => return,
    };
    match result {
        Ok(()) => {
            debug!(task = task_id, kind = ?picker.kind, value = item.id, "task updated");
            app.refresh_summary(task_id);
            app.select_task(task_id);
        }
        Err(err) => app.report(what, err),
    }
}

// ---------------------------------------------------------------------------
// Label creation
// ---------------------------------------------------------------------------

fn create_label(app: &mut App) {
    let Some(picker) = app.picker.as_ref() else {
        return;
    };
    let Some(draft) = picker.draft.clone() else {
        return;
    };
    let (task_id, form_bound) = (picker.task_id, picker.is_form_bound());
    if let Some(existing) = find_label_by_name(&app.board.labels, &draft.name) {
        let message = format!("Label \"{}\" already exists", existing.name);
        app.notices.warn(message);
        return;
    }

    let ctx = app.ctx();
    let created = app
        .store()
        .create_label(&ctx, app.board.project_id, &draft.name, draft.color());
    let label = match created {
        Ok(label) => label,
        Err(err) => {
            app.report("Failed to create label", err);
            return;
        }
    };
    info!(label = label.id, name = %label.name, "label created");
    app.board.labels.push(label.clone());

    let attached = form_bound || write_through(app, task_id, 0, Write::Attach(label.id));
    if let Some(picker) = app.picker.as_mut() {
        picker.push_created(PickerItem {
            color: Some(label.color.clone()),
            ..PickerItem::new(label.id, &label.name)
        });
        if !attached {
            picker.toggle(picker.items.len() - 1);
        }
    }
}

// ---------------------------------------------------------------------------
// Relation type chooser
// ---------------------------------------------------------------------------

fn open_relation_type_picker(app: &mut App) {
    let Some(picker) = app.picker.as_ref() else {
        return;
    };
    if !picker.kind.is_relation() {
        return;
    }
    let Some(index) = picker.current_item() else {
        return;
    };
    if app.board.relation_types.is_empty() {
        app.notices.info("No relation types defined");
        return;
    }
    let current = picker.items[index].relation_type;
    app.relation_picker = Some(RelationTypePicker::new(
        app.board.relation_types.clone(),
        current,
        picker.kind.mode(),
        index,
    ));
    app.mode = Mode::RelationTypePicker;
}

pub fn handle_relation_type_picker(app: &mut App, key: KeyEvent) {
    let Some(chooser) = app.relation_picker.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    match key.code {
        KeyCode::Esc => {
            app.mode = chooser.return_mode;
            app.relation_picker = None;
        }
        KeyCode::Up => chooser.move_up(),
        KeyCode::Down => chooser.move_down(),
        KeyCode::Enter => apply_relation_type(app),
        _ => {}
    }
}

/// Set the chosen type on the item, selecting it if it was not already.
fn apply_relation_type(app: &mut App) {
    let Some(chooser) = app.relation_picker.take() else {
        return;
    };
    app.mode = chooser.return_mode;
    let Some(ty) = chooser.current().map(|t| t.id) else {
        return;
    };
    let Some(picker) = app.picker.as_mut() else {
        app.mode = Mode::Normal;
        return;
    };
    let index = chooser.item_index;
    let Some(item) = picker.items.get_mut(index) else {
        return;
    };
    if picker.return_mode == Mode::TaskForm {
        item.selected = true;
        item.relation_type = Some(ty);
        return;
    }
    if item.selected && item.relation_type == Some(ty) {
        return;
    }

    let (task_id, other, selected) = (picker.task_id, item.id, item.selected);
    let (parent, child) = endpoints(picker.kind, task_id, other);
    let write = if selected {
        Write::Retype { parent, child, ty }
    } else {
        Write::Link { parent, child, ty }
    };
    if write_through(app, task_id, other, write)
        && let Some(item) = app.picker.as_mut().and_then(|p| p.items.get_mut(index))
    {
        item.selected = true;
        item.relation_type = Some(ty);
    }
}
