use super::widget::{Form, FormMsg};

/// Plain field values for one entity type, plus the adapter that copies them
/// out of the form widget.
pub trait FieldSet: Clone + PartialEq {
    /// Build the widget pre-filled with these values
    fn build_form(&self, title: &str) -> Form;

    /// Copy the widget's text buffers into the fields. Values the widget
    /// does not hold (selections made in pickers) are left alone.
    fn read_from(&mut self, form: &Form);

    /// The required text field, checked for blankness on commit
    fn primary(&self) -> &str;

    /// Canonical form for change detection; order-insensitive sets sorted.
    fn normalized(&self) -> Self {
        self.clone()
    }
}

/// One open add/edit session. `editing_id` is 0 when creating.
#[derive(Debug, Clone)]
pub struct FormSession<F: FieldSet> {
    pub editing_id: i64,
    pub form: Form,
    pub fields: F,
    snapshot: F,
}

impl<F: FieldSet> FormSession<F> {
    pub fn open(editing_id: i64, fields: F, title: &str) -> Self {
        FormSession {
            editing_id,
            form: fields.build_form(title),
            snapshot: fields.clone(),
            fields,
        }
    }

    pub fn is_create(&self) -> bool {
        self.editing_id == 0
    }

    /// Widget first, then the adapter copy.
    pub fn update(&mut self, msg: FormMsg) {
        self.form.update(msg);
        self.fields.read_from(&self.form);
    }

    pub fn snapshot(&self) -> &F {
        &self.snapshot
    }

    pub fn has_changes(&self) -> bool {
        self.fields.normalized() != self.snapshot.normalized()
    }

    /// Primary field is empty after trimming
    pub fn is_blank(&self) -> bool {
        self.fields.primary().trim().is_empty()
    }
}
