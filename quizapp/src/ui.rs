//! Terminal pages of the quiz.
//!
//! The cursive event loop owns the [`AppShell`]. Requests to the server run
//! on the tokio runtime and their results come back through the callback
//! sink, so the session is only ever touched on the UI thread.

use anyhow::anyhow;
use cursive::{
    Cursive, CursiveExt,
    event::Event,
    traits::{Nameable, Scrollable},
    views::{Dialog, DummyView, LinearLayout, SelectView, TextView},
};
use quizform::{
    form::Form,
    ui::{FormHost, form_view, init_ui_logger, show_error},
};
use tokio::runtime::Handle;

use crate::{
    client::{AnswerResult, ClientError, Problem, QuizClient},
    ctx::{AppShell, Page, ProblemState, SessionError},
};

const PROBLEM_TEXT: &str = "problem.text";
const PROBLEM_OPTIONS: &str = "problem.options";
const PROBLEM_RESULT: &str = "problem.result";

/// Cursive user data of the quiz.
struct QuizUi {
    shell: AppShell,
    client: QuizClient,
    runtime: Handle,
}

impl FormHost for QuizUi {
    fn form_mut(&mut self) -> &mut Form {
        self.shell.form_mut()
    }
}

/// Run the quiz until the user quits and hand the session back.
///
/// Must be called outside of the tokio runtime threads (for example in
/// `spawn_blocking`); `runtime` is used for the server requests.
pub fn run(shell: AppShell, client: QuizClient, runtime: Handle) -> anyhow::Result<AppShell> {
    init_ui_logger();
    let mut siv = Cursive::default();
    siv.set_user_data(QuizUi {
        shell,
        client,
        runtime,
    });

    siv.add_global_callback(Event::CtrlChar('q'), Cursive::quit);
    siv.add_global_callback('~', Cursive::toggle_debug_console);

    show_page(&mut siv);
    request_question(&mut siv);
    siv.run();

    let ui = siv
        .take_user_data::<QuizUi>()
        .ok_or_else(|| anyhow!("quiz state lost"))?;
    Ok(ui.shell)
}

fn show_page(siv: &mut Cursive) {
    let Some(page) = siv.with_user_data(|ui: &mut QuizUi| ui.shell.page()) else {
        return;
    };
    while siv.pop_layer().is_some() {}
    match page {
        Page::User => user_page(siv),
        Page::Question => question_page(siv),
    }
}

fn goto(siv: &mut Cursive, page: Page) {
    if let Some(Err(e)) = siv.with_user_data(|ui: &mut QuizUi| ui.shell.set_page(page)) {
        show_error(siv, "Cannot switch page", e);
        return;
    }
    show_page(siv);
}

fn user_page(siv: &mut Cursive) {
    let Some(view) = siv.with_user_data(|ui: &mut QuizUi| ui.shell.form().view()) else {
        return;
    };
    let body = form_view::<QuizUi>(&view);
    siv.add_fullscreen_layer(
        Dialog::around(body.scrollable())
            .title("Profile")
            .button("Start quiz", |s| goto(s, Page::Question))
            .button("Quit", Cursive::quit),
    );
}

fn question_page(siv: &mut Cursive) {
    let options = SelectView::<String>::new()
        .on_select(|s: &mut Cursive, id: &String| {
            if let Some(Err(e)) = s.with_user_data(|ui: &mut QuizUi| ui.shell.select(id)) {
                warn!("selection ignored: {e}");
            }
        })
        .with_name(PROBLEM_OPTIONS);
    let layout = LinearLayout::vertical()
        .child(TextView::new("Loading question...").with_name(PROBLEM_TEXT))
        .child(DummyView)
        .child(options)
        .child(DummyView)
        .child(TextView::new("").with_name(PROBLEM_RESULT));

    siv.add_fullscreen_layer(
        Dialog::around(layout.scrollable())
            .title("Question")
            .button("Submit", submit)
            .button("Next question", request_question)
            .button("Edit profile", |s| goto(s, Page::User))
            .button("Quit", Cursive::quit),
    );
    refresh_problem(siv);
}

/// Copy the current problem into the question page, if it is shown.
fn refresh_problem(siv: &mut Cursive) {
    let Some(Some(state)) = siv.with_user_data(|ui: &mut QuizUi| ui.shell.problem().cloned())
    else {
        return;
    };

    siv.call_on_name(PROBLEM_TEXT, |v: &mut TextView| {
        v.set_content(state.problem.text.clone())
    });
    siv.call_on_name(PROBLEM_OPTIONS, |v: &mut SelectView<String>| {
        v.clear();
        for option in &state.problem.options {
            v.add_item(format!("{}. {}", option.id, option.text), option.id.clone());
        }
        let selected = state
            .selected
            .as_ref()
            .and_then(|id| state.problem.options.iter().position(|o| &o.id == id));
        if let Some(idx) = selected {
            v.set_selection(idx);
        }
    });
    siv.call_on_name(PROBLEM_RESULT, |v: &mut TextView| {
        v.set_content(result_line(&state))
    });
}

fn result_line(state: &ProblemState) -> String {
    match (&state.result, state.is_correct()) {
        (None, _) => String::new(),
        (Some(result), Some(true)) => format!("Correct! The answer is {}.", result.correct),
        (Some(result), _) => format!("Not quite. The correct answer is {}.", result.correct),
    }
}

fn request_question(siv: &mut Cursive) {
    let prepared = siv.with_user_data(|ui: &mut QuizUi| {
        ui.shell
            .begin_question()
            .map(|(req, ticket)| (req, ticket, ui.client.clone(), ui.runtime.clone()))
    });
    let (request, ticket, client, runtime) = match prepared {
        Some(Ok(prepared)) => prepared,
        Some(Err(e)) => {
            show_error(siv, "Cannot load question", e);
            return;
        }
        None => return,
    };

    siv.call_on_name(PROBLEM_TEXT, |v: &mut TextView| {
        v.set_content("Loading question...")
    });
    let sink = siv.cb_sink().clone();
    runtime.spawn(async move {
        let result = client.question(&request).await;
        if sink
            .send(Box::new(move |s: &mut Cursive| on_question(s, ticket, result)))
            .is_err()
        {
            warn!("UI closed before the question arrived");
        }
    });
}

fn on_question(siv: &mut Cursive, ticket: u64, result: Result<Problem, ClientError>) {
    match result {
        Ok(problem) => {
            info!("loaded question {:?}", problem.id);
            let taken = siv.with_user_data(|ui: &mut QuizUi| {
                ui.shell.receive_problem(ticket, problem)
            });
            if taken == Some(true) {
                refresh_problem(siv);
            }
        }
        Err(e) => show_error(siv, "Cannot load question", e),
    }
}

fn submit(siv: &mut Cursive) {
    // A highlighted option counts as selected even if it was never moved to.
    let highlighted = siv
        .call_on_name(PROBLEM_OPTIONS, |v: &mut SelectView<String>| v.selection())
        .flatten();
    let prepared = siv.with_user_data(|ui: &mut QuizUi| -> Result<_, SessionError> {
        if let Some(id) = &highlighted {
            ui.shell.select(id.as_str())?;
        }
        let request = ui.shell.answer_request()?;
        Ok((
            request,
            ui.shell.generation(),
            ui.client.clone(),
            ui.runtime.clone(),
        ))
    });
    let (request, generation, client, runtime) = match prepared {
        Some(Ok(prepared)) => prepared,
        Some(Err(e)) => {
            show_error(siv, "Cannot submit", e);
            return;
        }
        None => return,
    };

    let sink = siv.cb_sink().clone();
    runtime.spawn(async move {
        let result = client.answer(&request).await;
        if sink
            .send(Box::new(move |s: &mut Cursive| on_answer(s, generation, result)))
            .is_err()
        {
            warn!("UI closed before the answer was checked");
        }
    });
}

fn on_answer(siv: &mut Cursive, generation: u64, result: Result<AnswerResult, ClientError>) {
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            show_error(siv, "Cannot submit", e);
            return;
        }
    };
    info!("answer checked, correct option {}", result.correct);
    match siv.with_user_data(|ui: &mut QuizUi| ui.shell.set_result(generation, result)) {
        Some(Ok(true)) => refresh_problem(siv),
        Some(Ok(false)) | None => {}
        Some(Err(e)) => show_error(siv, "Cannot submit", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AnswerOption;

    fn state(selected: Option<&str>, correct: Option<&str>) -> ProblemState {
        ProblemState {
            problem: Problem {
                id: None,
                text: "Q".into(),
                options: vec![AnswerOption {
                    id: "A".into(),
                    text: "a".into(),
                }],
            },
            selected: selected.map(str::to_string),
            result: correct.map(|c| AnswerResult {
                correct: c.to_string(),
            }),
        }
    }

    #[test]
    fn test_result_line() {
        assert_eq!(result_line(&state(Some("A"), None)), "");
        assert_eq!(
            result_line(&state(Some("A"), Some("A"))),
            "Correct! The answer is A."
        );
        assert_eq!(
            result_line(&state(Some("A"), Some("B"))),
            "Not quite. The correct answer is B."
        );
    }
}
