//! Form widget and the add/edit sessions built on it.

mod fields;
mod session;
mod text_input;
mod widget;

pub use fields::{ColumnFields, CommentFields, ProjectFields, TaskFields};
pub use session::{FieldSet, FormSession};
pub use text_input::TextInput;
pub use widget::{FieldKind, Form, FormField, FormMsg, FormState};
