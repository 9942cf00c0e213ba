use crate::data::{InputKind, Slot};

/// Toolkit-independent snapshot of a rendered field.
///
/// Produced by [`FormRenderer::render`](super::FormRenderer::render); the
/// terminal adapter turns it into widgets.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldView {
    /// A fieldset holding nested fields.
    Group {
        label: String,
        slot: Slot,
        children: Vec<FieldView>,
    },
    /// A closed-set selector.
    Choice {
        label: String,
        slot: Slot,
        options: Vec<String>,
        /// Index of the current value in `options`, if it is one of them.
        selected: Option<usize>,
        /// Current value as text, empty when missing.
        text: String,
    },
    /// A single-value input.
    Input {
        label: String,
        slot: Slot,
        kind: InputKind,
        text: String,
    },
}

impl FieldView {
    pub fn label(&self) -> &str {
        match self {
            FieldView::Group { label, .. }
            | FieldView::Choice { label, .. }
            | FieldView::Input { label, .. } => label,
        }
    }

    pub fn slot(&self) -> &Slot {
        match self {
            FieldView::Group { slot, .. }
            | FieldView::Choice { slot, .. }
            | FieldView::Input { slot, .. } => slot,
        }
    }

    /// Nested views of a group, empty for leaves.
    pub fn children(&self) -> &[FieldView] {
        match self {
            FieldView::Group { children, .. } => children,
            _ => &[],
        }
    }
}
