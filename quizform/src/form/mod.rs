//! Schema-driven form rendering.
//!
//! A [`FormRenderer`] is built once per schema node. Groups (the schema root
//! included) build one child renderer per nested field, all sharing the same
//! [`OnChange`] callback. Leaves write into the model through their [`Slot`]
//! and defer the callback on a [`ChangeQueue`].
//!
//! [`Form`] is the owner side: it holds the model, the renderer tree and the
//! queue, and is what a UI talks to.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::data::{
    FieldSchema, InputKind, Model, SchemaRoot, Slot,
    item::{display_value, is_checked},
};

/// Deferred change notification.
pub mod notify;

/// Toolkit-independent field snapshots.
pub mod view;

pub use notify::{ChangeQueue, OnChange, ignore_changes, on_change};
pub use view::FieldView;

/// Errors from applying an edit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    /// No field of the form is bound to the slot.
    #[error("no field bound to `{slot}`")]
    UnknownField { slot: String },
    /// The slot names a group, which has no value of its own.
    #[error("`{slot}` is a group and cannot be edited directly")]
    NotALeaf { slot: String },
}

/// How a renderer presents its field.
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    /// Nested renderers, one per sub-field.
    Group(Vec<FormRenderer>),
    /// Selector over exactly these values.
    Choice { options: Vec<String> },
    /// Single input of the given kind.
    Primitive { kind: InputKind },
}

/// Renderer for one schema node bound to one model slot.
#[derive(Clone)]
pub struct FormRenderer {
    label: String,
    slot: Slot,
    presentation: Presentation,
    on_change: OnChange,
}

impl fmt::Debug for FormRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormRenderer")
            .field("label", &self.label)
            .field("slot", &self.slot)
            .field("presentation", &self.presentation)
            .finish_non_exhaustive()
    }
}

// Callbacks are compared by identity.
impl PartialEq for FormRenderer {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
            && self.slot == other.slot
            && self.presentation == other.presentation
            && std::rc::Rc::ptr_eq(&self.on_change, &other.on_change)
    }
}

impl FormRenderer {
    /// Renderer for a whole form: a group bound to the model root.
    pub fn root(root: &SchemaRoot, on_change: OnChange) -> Self {
        let label = root.title.clone().unwrap_or_default();
        Self::group(label, Slot::root(), &root.fields, on_change)
    }

    /// Renderer for one field nested under `parent`.
    pub fn field(schema: &FieldSchema, parent: &Slot, on_change: OnChange) -> Self {
        let label = schema.name().to_string();
        let slot = parent.child(schema.id());
        match schema {
            FieldSchema::Group(group) => Self::group(label, slot, &group.fields, on_change),
            FieldSchema::Choice(choice) => Self {
                label,
                slot,
                presentation: Presentation::Choice {
                    options: choice.options.clone(),
                },
                on_change,
            },
            FieldSchema::Primitive(primitive) => Self {
                label,
                slot,
                presentation: Presentation::Primitive {
                    kind: primitive.kind.clone(),
                },
                on_change,
            },
        }
    }

    fn group(label: String, slot: Slot, fields: &[FieldSchema], on_change: OnChange) -> Self {
        let children = fields
            .iter()
            .map(|field| Self::field(field, &slot, on_change.clone()))
            .collect();
        Self {
            label,
            slot,
            presentation: Presentation::Group(children),
            on_change,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Model slot this renderer reads and writes.
    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    pub fn on_change(&self) -> &OnChange {
        &self.on_change
    }

    /// Child renderers of a group, empty for leaves.
    pub fn children(&self) -> &[FormRenderer] {
        match &self.presentation {
            Presentation::Group(children) => children,
            _ => &[],
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.presentation, Presentation::Group(_))
    }

    /// Find the renderer bound to `slot` in this subtree.
    pub fn find(&self, slot: &Slot) -> Option<&FormRenderer> {
        if &self.slot == slot {
            return Some(self);
        }
        self.children()
            .iter()
            .filter(|child| slot.starts_with(&child.slot))
            .find_map(|child| child.find(slot))
    }

    /// Snapshot of this subtree for the current model.
    ///
    /// Reading never changes the model; missing values show as empty.
    pub fn render(&self, model: &Model) -> FieldView {
        let label = self.label.clone();
        let slot = self.slot.clone();
        match &self.presentation {
            Presentation::Group(children) => FieldView::Group {
                label,
                slot,
                children: children.iter().map(|c| c.render(model)).collect(),
            },
            Presentation::Choice { options } => {
                let value = self.slot.read(model);
                let current = value.and_then(Value::as_str);
                FieldView::Choice {
                    label,
                    slot,
                    options: options.clone(),
                    selected: current.and_then(|v| options.iter().position(|o| o == v)),
                    text: display_value(value),
                }
            }
            Presentation::Primitive { kind } => {
                let value = self.slot.read(model);
                let text = match kind {
                    InputKind::Checkbox => is_checked(value).to_string(),
                    _ => display_value(value),
                };
                FieldView::Input {
                    label,
                    slot,
                    kind: kind.clone(),
                    text,
                }
            }
        }
    }

    /// Value an input widget's text stands for in this field.
    pub fn text_to_value(&self, text: &str) -> Value {
        match &self.presentation {
            Presentation::Primitive { kind } => kind.parse_input(text),
            _ => Value::String(text.to_string()),
        }
    }

    /// Store `value` in this leaf's slot, then defer the change callback.
    ///
    /// Groups never notify on their own; only their leaves do.
    pub fn apply(
        &self,
        model: &mut Model,
        value: Value,
        queue: &mut ChangeQueue,
    ) -> Result<(), FormError> {
        if self.is_group() {
            return Err(FormError::NotALeaf {
                slot: self.slot.to_string(),
            });
        }
        self.slot.write(model, value);
        queue.defer(self.on_change.clone());
        Ok(())
    }
}

/// A form: model, renderer tree and pending notifications.
pub struct Form {
    renderer: FormRenderer,
    model: Model,
    queue: ChangeQueue,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("renderer", &self.renderer)
            .field("model", &self.model)
            .field("queue", &self.queue)
            .finish()
    }
}

impl Form {
    /// Bind `root` to `model`, notifying `on_change` after edits settle.
    pub fn new(root: &SchemaRoot, model: Model, on_change: OnChange) -> Self {
        Self {
            renderer: FormRenderer::root(root, on_change),
            model,
            queue: ChangeQueue::new(),
        }
    }

    pub fn renderer(&self) -> &FormRenderer {
        &self.renderer
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Snapshot of the whole form.
    pub fn view(&self) -> FieldView {
        self.renderer.render(&self.model)
    }

    /// Store a widget value in the field bound to `slot`.
    pub fn edit(&mut self, slot: &Slot, value: Value) -> Result<(), FormError> {
        let field = bound_field(&self.renderer, slot)?;
        field.apply(&mut self.model, value, &mut self.queue)
    }

    /// Store widget text, converted according to the field's input kind.
    pub fn edit_text(&mut self, slot: &Slot, text: &str) -> Result<(), FormError> {
        let field = bound_field(&self.renderer, slot)?;
        let value = field.text_to_value(text);
        field.apply(&mut self.model, value, &mut self.queue)
    }

    /// Number of notifications waiting for [`Form::flush`].
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Deliver pending notifications. Call once per UI tick.
    pub fn flush(&mut self) -> usize {
        self.queue.flush(&self.model)
    }
}

fn bound_field<'a>(renderer: &'a FormRenderer, slot: &Slot) -> Result<&'a FormRenderer, FormError> {
    renderer.find(slot).ok_or_else(|| FormError::UnknownField {
        slot: slot.to_string(),
    })
}
