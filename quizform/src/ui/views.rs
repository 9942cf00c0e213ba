use cursive::{
    Cursive, View,
    traits::{Nameable, Resizable},
    views::{BoxedView, Checkbox, EditView, LinearLayout, Panel, SelectView, TextView},
};
use serde_json::Value;

use crate::{
    data::{InputKind, Slot},
    form::FieldView,
    ui::{FormHost, apply_edit},
};

const LABEL_WIDTH: usize = 20;

/// Items of a choice widget. `None` marks the entry showing a value that is
/// missing or not one of the options.
type ChoiceSelect = SelectView<Option<String>>;

/// Build widgets for a rendered form.
///
/// Groups become titled panels, choices popup selectors, and primitives
/// edit boxes (or checkboxes). Each widget is named after its slot.
pub fn form_view<H: FormHost>(view: &FieldView) -> BoxedView {
    BoxedView::new(field_widget::<H>(view))
}

fn field_widget<H: FormHost>(view: &FieldView) -> Box<dyn View> {
    match view {
        FieldView::Group {
            label, children, ..
        } => {
            let mut layout = LinearLayout::vertical();
            for child in children {
                layout.add_child(field_widget::<H>(child));
            }
            if label.is_empty() {
                Box::new(layout)
            } else {
                Box::new(Panel::new(layout).title(label.as_str()))
            }
        }
        FieldView::Choice {
            label,
            slot,
            options,
            selected,
            text,
        } => labeled(label, choice_view::<H>(slot, options, *selected, text)),
        FieldView::Input {
            label,
            slot,
            kind: InputKind::Checkbox,
            text,
        } => labeled(label, checkbox_view::<H>(slot, text == "true")),
        FieldView::Input {
            label, slot, text, ..
        } => labeled(label, input_view::<H>(slot, text)),
    }
}

fn labeled(label: &str, widget: Box<dyn View>) -> Box<dyn View> {
    Box::new(
        LinearLayout::horizontal()
            .child(TextView::new(format!("{label}:")).fixed_width(LABEL_WIDTH))
            .child(widget),
    )
}

fn input_view<H: FormHost>(slot: &Slot, text: &str) -> Box<dyn View> {
    let name = slot.to_string();
    let slot = slot.clone();
    let edit = EditView::new()
        .content(text)
        .on_edit(move |siv: &mut Cursive, text: &str, _cursor: usize| {
            apply_edit::<H, _>(siv, &slot, |form| form.edit_text(&slot, text));
        });
    Box::new(edit.with_name(name).full_width())
}

fn choice_view<H: FormHost>(
    slot: &Slot,
    options: &[String],
    selected: Option<usize>,
    text: &str,
) -> Box<dyn View> {
    let name = slot.to_string();
    let mut select = ChoiceSelect::new().popup();
    if selected.is_none() {
        select.add_item(text, None);
    }
    for option in options {
        select.add_item(option.as_str(), Some(option.clone()));
    }

    let slot = slot.clone();
    let select = select
        .selected(selected.unwrap_or(0))
        .on_submit(move |siv: &mut Cursive, choice: &Option<String>| {
            let Some(choice) = choice else {
                return;
            };
            let value = Value::String(choice.clone());
            apply_edit::<H, _>(siv, &slot, |form| form.edit(&slot, value));
            drop_placeholder(siv, &slot.to_string());
        });
    Box::new(select.with_name(name))
}

/// Remove the entry for an unset value once a real option has been chosen.
fn drop_placeholder(siv: &mut Cursive, name: &str) {
    siv.call_on_name(name, |v: &mut ChoiceSelect| {
        let unset = matches!(v.get_item(0), Some((_, None)));
        if unset {
            v.remove_item(0);
        }
    });
}

fn checkbox_view<H: FormHost>(slot: &Slot, checked: bool) -> Box<dyn View> {
    let name = slot.to_string();
    let slot = slot.clone();
    let checkbox = Checkbox::new()
        .with_checked(checked)
        .on_change(move |siv: &mut Cursive, checked: bool| {
            apply_edit::<H, _>(siv, &slot, |form| form.edit(&slot, Value::Bool(checked)));
        });
    Box::new(checkbox.with_name(name))
}
