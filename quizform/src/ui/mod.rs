//! Cursive integration.
//!
//! Forms live in the cursive user data of a type implementing [`FormHost`].
//! Widgets built by [`form_view`] write edits into that form and schedule
//! [`Form::flush`] for the next event-loop cycle through the callback sink.

use cursive::{Cursive, views::Dialog};

use crate::form::{Form, FormError};
use crate::data::Slot;

/// Widgets for form fields.
pub mod views;

pub use views::form_view;

/// Cursive user data that owns a form.
pub trait FormHost: 'static {
    fn form_mut(&mut self) -> &mut Form;
}

/// Run the host form's pending notifications on the next event-loop cycle.
pub fn schedule_flush<H: FormHost>(siv: &mut Cursive) {
    let sent = siv.cb_sink().send(Box::new(|s: &mut Cursive| {
        if let Some(count) = s.with_user_data(|host: &mut H| host.form_mut().flush()) {
            trace!("delivered {count} change notification(s)");
        }
    }));
    if sent.is_err() {
        warn!("event loop stopped, change notification dropped");
    }
}

/// Apply an edit to the host form and schedule its notification.
pub fn apply_edit<H, F>(siv: &mut Cursive, slot: &Slot, edit: F)
where
    H: FormHost,
    F: FnOnce(&mut Form) -> Result<(), FormError>,
{
    match siv.with_user_data(|host: &mut H| edit(host.form_mut())) {
        Some(Ok(())) => schedule_flush::<H>(siv),
        Some(Err(e)) => warn!("edit of `{slot}` rejected: {e}"),
        None => warn!("no form attached to the UI"),
    }
}

/// Route `log` records to the cursive debug console (`~`).
///
/// Only active with the `logging` feature; safe to call more than once.
pub fn init_ui_logger() {
    #[cfg(feature = "logging")]
    {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            cursive::logger::init();
            cursive::logger::set_filter_levels_from_env();
        });
    }
}

/// Show an error in a dismissible dialog.
pub fn show_error(siv: &mut Cursive, title: &str, message: impl std::fmt::Display) {
    error!("{title}: {message}");
    siv.add_layer(Dialog::info(message.to_string()).title(title));
}
