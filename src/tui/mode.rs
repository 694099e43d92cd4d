/// The single active interaction mode. Whoever the mode names owns the
/// keyboard; switching modes is the only way input ownership changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Normal,
    DeleteTaskConfirm,
    DeleteColumnConfirm,
    DiscardConfirm,
    /// Inline column name prompt in the status row
    AddColumn,
    EditColumn,
    AddColumnForm,
    EditColumnForm,
    TaskForm,
    ProjectForm,
    CommentForm,
    CommentsView,
    CommentEdit,
    HelpOverlay,
    TaskFormHelpOverlay,
    LabelPicker,
    ParentPicker,
    ChildPicker,
    PriorityPicker,
    TypePicker,
    RelationTypePicker,
    StatusPicker,
    Search,
    ViewTask,
}

impl Mode {
    pub const ALL: [Mode; 24] = [
        Mode::Normal,
        Mode::DeleteTaskConfirm,
        Mode::DeleteColumnConfirm,
        Mode::DiscardConfirm,
        Mode::AddColumn,
        Mode::EditColumn,
        Mode::AddColumnForm,
        Mode::EditColumnForm,
        Mode::TaskForm,
        Mode::ProjectForm,
        Mode::CommentForm,
        Mode::CommentsView,
        Mode::CommentEdit,
        Mode::HelpOverlay,
        Mode::TaskFormHelpOverlay,
        Mode::LabelPicker,
        Mode::ParentPicker,
        Mode::ChildPicker,
        Mode::PriorityPicker,
        Mode::TypePicker,
        Mode::RelationTypePicker,
        Mode::StatusPicker,
        Mode::Search,
        Mode::ViewTask,
    ];

    /// Short label for the status row
    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "BOARD",
            Mode::DeleteTaskConfirm | Mode::DeleteColumnConfirm => "DELETE",
            Mode::DiscardConfirm => "DISCARD",
            Mode::AddColumn | Mode::AddColumnForm => "NEW COLUMN",
            Mode::EditColumn | Mode::EditColumnForm => "EDIT COLUMN",
            Mode::TaskForm => "TASK",
            Mode::ProjectForm => "PROJECT",
            Mode::CommentForm => "NEW COMMENT",
            Mode::CommentEdit => "EDIT COMMENT",
            Mode::CommentsView => "COMMENTS",
            Mode::HelpOverlay | Mode::TaskFormHelpOverlay => "HELP",
            Mode::LabelPicker => "LABELS",
            Mode::ParentPicker => "PARENTS",
            Mode::ChildPicker => "CHILDREN",
            Mode::PriorityPicker => "PRIORITY",
            Mode::TypePicker => "TYPE",
            Mode::RelationTypePicker => "RELATION",
            Mode::StatusPicker => "STATUS",
            Mode::Search => "SEARCH",
            Mode::ViewTask => "VIEW",
        }
    }

    /// Modes served by the shared list picker
    pub fn is_picker(self) -> bool {
        matches!(
            self,
            Mode::LabelPicker
                | Mode::ParentPicker
                | Mode::ChildPicker
                | Mode::PriorityPicker
                | Mode::TypePicker
                | Mode::StatusPicker
        )
    }

    pub fn is_column_session(self) -> bool {
        matches!(
            self,
            Mode::AddColumn | Mode::EditColumn | Mode::AddColumnForm | Mode::EditColumnForm
        )
    }

    pub fn is_comment_session(self) -> bool {
        matches!(self, Mode::CommentForm | Mode::CommentEdit)
    }
}
