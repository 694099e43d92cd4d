use crate::model::{ColumnId, LabelId, ProjectId, TaskId};
use crate::ops::relations::RelationSet;

use super::session::FieldSet;
use super::widget::Form;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    pub column_id: ColumnId,
    pub title: String,
    pub description: String,
    pub labels: Vec<LabelId>,
    pub parents: RelationSet,
    pub children: RelationSet,
    pub priority_id: i64,
    pub type_id: i64,
}

impl FieldSet for TaskFields {
    fn build_form(&self, title: &str) -> Form {
        Form::new(title)
            .line("title", "Title", &self.title)
            .multiline("description", "Description", &self.description)
    }

    fn read_from(&mut self, form: &Form) {
        self.title = form.value("title").to_string();
        self.description = form.value("description").to_string();
    }

    fn primary(&self) -> &str {
        &self.title
    }

    fn normalized(&self) -> Self {
        let mut n = self.clone();
        n.labels.sort_unstable();
        n.parents.sort_unstable();
        n.children.sort_unstable();
        n
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFields {
    pub name: String,
    pub description: String,
}

impl FieldSet for ProjectFields {
    fn build_form(&self, title: &str) -> Form {
        Form::new(title)
            .line("name", "Name", &self.name)
            .multiline("description", "Description", &self.description)
    }

    fn read_from(&mut self, form: &Form) {
        self.name = form.value("name").to_string();
        self.description = form.value("description").to_string();
    }

    fn primary(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFields {
    pub project_id: ProjectId,
    pub name: String,
}

impl FieldSet for ColumnFields {
    fn build_form(&self, title: &str) -> Form {
        Form::new(title).line("name", "Name", &self.name)
    }

    fn read_from(&mut self, form: &Form) {
        self.name = form.value("name").to_string();
    }

    fn primary(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentFields {
    pub task_id: TaskId,
    pub message: String,
}

impl FieldSet for CommentFields {
    fn build_form(&self, title: &str) -> Form {
        Form::new(title).multiline("message", "Message", &self.message)
    }

    fn read_from(&mut self, form: &Form) {
        self.message = form.value("message").to_string();
    }

    fn primary(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::form::{FormMsg, FormSession};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn type_into<F: FieldSet>(session: &mut FormSession<F>, s: &str) {
        for c in s.chars() {
            session.update(FormMsg::Key(KeyEvent::new(
                KeyCode::Char(c),
                KeyModifiers::NONE,
            )));
        }
    }

    #[test]
    fn typing_flows_into_fields() {
        let mut session = FormSession::open(0, TaskFields::default(), "New task");
        assert!(!session.has_changes());
        type_into(&mut session, "Write spec");
        assert_eq!(session.fields.title, "Write spec");
        assert!(session.has_changes());
    }

    #[test]
    fn relation_order_is_not_a_change() {
        let fields = TaskFields {
            title: "t".into(),
            parents: vec![(1, 1), (2, 2)],
            labels: vec![3, 4],
            ..TaskFields::default()
        };
        let mut session = FormSession::open(7, fields, "Edit task");
        session.fields.parents = vec![(2, 2), (1, 1)];
        session.fields.labels = vec![4, 3];
        assert!(!session.has_changes());

        session.fields.parents = vec![(2, 1), (1, 1)];
        assert!(session.has_changes());
    }

    #[test]
    fn blank_primary_field() {
        let session = FormSession::open(
            0,
            ColumnFields {
                project_id: 1,
                name: "   ".into(),
            },
            "New column",
        );
        assert!(session.is_blank());
    }

    #[test]
    fn edit_back_to_original_has_no_changes() {
        let mut session = FormSession::open(
            3,
            CommentFields {
                task_id: 1,
                message: "ok".into(),
            },
            "Edit comment",
        );
        type_into(&mut session, "!");
        assert!(session.has_changes());
        session.update(FormMsg::Key(KeyEvent::new(
            KeyCode::Backspace,
            KeyModifiers::NONE,
        )));
        assert!(!session.has_changes());
    }
}
