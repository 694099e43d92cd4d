//! Filterable selection-list popups (labels, relations, priority, type,
//! status) and the relation-type chooser nested under relation pickers.

use crate::model::{RelationType, RelationTypeId, TaskId, DEFAULT_RELATION_TYPE};
use crate::ops::labels::same_label_name;
use crate::ops::relations::RelationSet;
use crate::tui::mode::Mode;
use crate::tui::theme::LABEL_PALETTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKind {
    Label,
    Parent,
    Child,
    Priority,
    Type,
    Status,
}

impl PickerKind {
    pub fn mode(self) -> Mode {
        match self {
            PickerKind::Label => Mode::LabelPicker,
            PickerKind::Parent => Mode::ParentPicker,
            PickerKind::Child => Mode::ChildPicker,
            PickerKind::Priority => Mode::PriorityPicker,
            PickerKind::Type => Mode::TypePicker,
            PickerKind::Status => Mode::StatusPicker,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PickerKind::Label => "Labels",
            PickerKind::Parent => "Parent tasks",
            PickerKind::Child => "Child tasks",
            PickerKind::Priority => "Priority",
            PickerKind::Type => "Type",
            PickerKind::Status => "Move to column",
        }
    }

    /// Enter applies one item and closes instead of toggling
    pub fn is_single_select(self) -> bool {
        matches!(
            self,
            PickerKind::Priority | PickerKind::Type | PickerKind::Status
        )
    }

    pub fn is_relation(self) -> bool {
        matches!(self, PickerKind::Parent | PickerKind::Child)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItem {
    pub id: i64,
    pub name: String,
    /// Secondary text, e.g. the column a related task sits in
    pub hint: Option<String>,
    /// `#RRGGBB`
    pub color: Option<String>,
    pub selected: bool,
    pub relation_type: Option<RelationTypeId>,
}

impl PickerItem {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        PickerItem {
            id,
            name: name.into(),
            hint: None,
            color: None,
            selected: false,
            relation_type: None,
        }
    }
}

/// A row of the filtered view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerRow {
    Item(usize),
    /// Synthetic "create new label" row
    Create,
}

/// Name and colour for a label being created from the filter text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDraft {
    pub name: String,
    pub color_index: usize,
}

impl LabelDraft {
    pub fn color(&self) -> &'static str {
        LABEL_PALETTE[self.color_index % LABEL_PALETTE.len()]
    }

    pub fn next_color(&mut self) {
        self.color_index = (self.color_index + 1) % LABEL_PALETTE.len();
    }

    pub fn prev_color(&mut self) {
        self.color_index = (self.color_index + LABEL_PALETTE.len() - 1) % LABEL_PALETTE.len();
    }
}

#[derive(Debug, Clone)]
pub struct PickerSession {
    pub kind: PickerKind,
    pub items: Vec<PickerItem>,
    pub filter: String,
    /// Index into the filtered rows
    pub cursor: usize,
    pub return_mode: Mode,
    /// Task the picker edits; 0 for a task form that is still creating
    pub task_id: TaskId,
    pub draft: Option<LabelDraft>,
}

impl PickerSession {
    pub fn new(
        kind: PickerKind,
        items: Vec<PickerItem>,
        return_mode: Mode,
        task_id: TaskId,
    ) -> Self {
        let mut picker = PickerSession {
            kind,
            items,
            filter: String::new(),
            cursor: 0,
            return_mode,
            task_id,
            draft: None,
        };
        // Single-select pickers open on the current value
        if kind.is_single_select()
            && let Some(pos) = picker.rows().iter().position(
                |row| matches!(row, PickerRow::Item(i) if picker.items[*i].selected),
            )
        {
            picker.cursor = pos;
        }
        picker
    }

    /// Toggling only edits local flags; the owning form saves them later.
    pub fn is_form_bound(&self) -> bool {
        self.return_mode == Mode::TaskForm
    }

    /// Item indices matching the filter, case-insensitively
    pub fn filtered(&self) -> Vec<usize> {
        let needle = self.filter.trim().to_lowercase();
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| needle.is_empty() || item.name.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect()
    }

    /// The "create" row is offered for labels when the filter names no
    /// existing label.
    pub fn offers_create(&self) -> bool {
        self.kind == PickerKind::Label
            && !self.filter.trim().is_empty()
            && !self.items.iter().any(|i| same_label_name(&i.name, &self.filter))
    }

    pub fn rows(&self) -> Vec<PickerRow> {
        let mut rows: Vec<PickerRow> = self.filtered().into_iter().map(PickerRow::Item).collect();
        if self.offers_create() {
            rows.push(PickerRow::Create);
        }
        rows
    }

    pub fn current(&self) -> Option<PickerRow> {
        self.rows().get(self.cursor).copied()
    }

    pub fn current_item(&self) -> Option<usize> {
        match self.current()? {
            PickerRow::Item(i) => Some(i),
            PickerRow::Create => None,
        }
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.clamp_cursor();
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let len = self.rows().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.rows().len() {
            self.cursor += 1;
        }
    }

    /// Flip the local selection flag. Newly selected relation rows get the
    /// default relation type. Returns the new flag.
    pub fn toggle(&mut self, index: usize) -> bool {
        let is_relation = self.kind.is_relation();
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.selected = !item.selected;
        if item.selected && is_relation && item.relation_type.is_none() {
            item.relation_type = Some(DEFAULT_RELATION_TYPE);
        }
        item.selected
    }

    pub fn begin_create(&mut self) {
        self.draft = Some(LabelDraft {
            name: self.filter.trim().to_string(),
            color_index: 0,
        });
    }

    /// Append a freshly created label as selected and show it.
    pub fn push_created(&mut self, item: PickerItem) {
        self.items.push(PickerItem {
            selected: true,
            ..item
        });
        self.draft = None;
        self.filter.clear();
        self.cursor = self.items.len() - 1;
    }

    pub fn selected_ids(&self) -> Vec<i64> {
        self.items.iter().filter(|i| i.selected).map(|i| i.id).collect()
    }

    pub fn selected_relations(&self) -> RelationSet {
        self.items
            .iter()
            .filter(|i| i.selected)
            .map(|i| (i.id, i.relation_type.unwrap_or(DEFAULT_RELATION_TYPE)))
            .collect()
    }
}

/// Chooses the relation type of one item in a parent/child picker.
#[derive(Debug, Clone)]
pub struct RelationTypePicker {
    pub items: Vec<RelationType>,
    pub cursor: usize,
    /// The relation picker to go back to
    pub return_mode: Mode,
    /// Item of that picker the chosen type is written to
    pub item_index: usize,
}

impl RelationTypePicker {
    pub fn new(
        items: Vec<RelationType>,
        current: Option<RelationTypeId>,
        return_mode: Mode,
        item_index: usize,
    ) -> Self {
        let cursor = current
            .and_then(|id| items.iter().position(|t| t.id == id))
            .unwrap_or(0);
        RelationTypePicker {
            items,
            cursor,
            return_mode,
            item_index,
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.items.len() {
            self.cursor += 1;
        }
    }

    pub fn current(&self) -> Option<&RelationType> {
        self.items.get(self.cursor)
    }
}
