//! Session state of the quiz application.
//!
//! [`AppShell`] owns the user profile form, the current page and the current
//! problem. The profile and the page survive restarts through [`Storage`].

use std::{cell::RefCell, rc::Rc};

use quizform::{
    data::{Model, SchemaRoot},
    form::{Form, on_change},
    ui::FormHost,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    client::{AnswerRequest, AnswerResult, Problem, QuestionRequest},
    store::{Storage, StoreError},
};

/// Storage key of the user profile.
pub const USER_KEY: &str = "user";
/// Storage key of the current page.
pub const PAGE_KEY: &str = "page";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("the user profile has no id")]
    MissingUserId,
    #[error("no question loaded")]
    NoProblem,
    #[error("no answer selected")]
    NoSelection,
    #[error("the question has no option `{id}`")]
    UnknownOption { id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    /// Profile form.
    #[default]
    User,
    /// Question and answer.
    Question,
}

/// A problem together with the user's selection and the server's verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemState {
    pub problem: Problem,
    pub selected: Option<String>,
    pub result: Option<AnswerResult>,
}

impl ProblemState {
    pub fn new(problem: Problem) -> Self {
        Self {
            problem,
            selected: None,
            result: None,
        }
    }

    /// Whether the selection matches the correct option, once answered.
    pub fn is_correct(&self) -> Option<bool> {
        let result = self.result.as_ref()?;
        Some(self.selected.as_deref() == Some(result.correct.as_str()))
    }
}

/// Profile used until one has been saved: `{"id": <default id>}`, or an
/// empty profile when the id is empty.
pub fn default_user(id: &str) -> Model {
    let mut user = Model::new();
    if !id.is_empty() {
        user.insert("id", Value::String(id.to_string()));
    }
    user
}

pub struct AppShell {
    page: Page,
    problem: Option<ProblemState>,
    generation: u64,
    question_ticket: u64,
    form: Form,
    storage: Rc<RefCell<Storage>>,
}

impl AppShell {
    /// Restore the session from `storage`.
    ///
    /// The stored profile (or `default`) is bound to a form over `schema`
    /// whose settled edits are saved back to the store.
    pub fn new(schema: &SchemaRoot, storage: Storage, default: Model) -> Result<Self, SessionError> {
        let user = storage.load::<Model>(USER_KEY)?.unwrap_or(default);
        let page = storage.load::<Page>(PAGE_KEY)?.unwrap_or_default();
        info!("session restored on page {page:?}");

        let storage = Rc::new(RefCell::new(storage));
        let form = Form::new(schema, user, {
            let storage = storage.clone();
            on_change(move |user: &Model| {
                if let Err(e) = storage.borrow_mut().save(USER_KEY, user) {
                    error!("failed to save user profile: {e}");
                }
            })
        });

        Ok(Self {
            page,
            problem: None,
            generation: 0,
            question_ticket: 0,
            form,
            storage,
        })
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Switch pages and remember the choice.
    pub fn set_page(&mut self, page: Page) -> Result<(), SessionError> {
        debug!("page {:?} -> {page:?}", self.page);
        self.page = page;
        self.storage.borrow_mut().save(PAGE_KEY, &page)?;
        Ok(())
    }

    pub fn user(&self) -> &Model {
        self.form.model()
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Persist the user profile now.
    pub fn save_user(&mut self) -> Result<(), SessionError> {
        self.form.flush();
        self.storage.borrow_mut().save(USER_KEY, self.form.model())?;
        Ok(())
    }

    /// Id of the current user. Numbers are accepted as well as strings.
    pub fn user_id(&self) -> Option<String> {
        match self.user().get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn question_request(&self) -> Result<QuestionRequest, SessionError> {
        let user = self.user_id().ok_or(SessionError::MissingUserId)?;
        Ok(QuestionRequest { user })
    }

    /// Start a question request. Only the latest ticket may deliver a problem.
    pub fn begin_question(&mut self) -> Result<(QuestionRequest, u64), SessionError> {
        let request = self.question_request()?;
        self.question_ticket += 1;
        Ok((request, self.question_ticket))
    }

    /// Show the problem answering request `ticket`, unless a newer request
    /// has been started since. Returns whether the problem was taken.
    pub fn receive_problem(&mut self, ticket: u64, problem: Problem) -> bool {
        if ticket != self.question_ticket {
            debug!("dropping problem for superseded request {ticket}");
            return false;
        }
        self.set_problem(problem);
        true
    }

    pub fn problem(&self) -> Option<&ProblemState> {
        self.problem.as_ref()
    }

    /// Counter bumped by every [`set_problem`](Self::set_problem).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Show a new problem, dropping any selection and result.
    pub fn set_problem(&mut self, problem: Problem) {
        self.generation += 1;
        self.problem = Some(ProblemState::new(problem));
    }

    pub fn select(&mut self, option_id: &str) -> Result<(), SessionError> {
        let state = self.problem.as_mut().ok_or(SessionError::NoProblem)?;
        if !state.problem.options.iter().any(|o| o.id == option_id) {
            return Err(SessionError::UnknownOption {
                id: option_id.to_string(),
            });
        }
        state.selected = Some(option_id.to_string());
        Ok(())
    }

    pub fn answer_request(&self) -> Result<AnswerRequest, SessionError> {
        let state = self.problem.as_ref().ok_or(SessionError::NoProblem)?;
        let selected = state.selected.clone().ok_or(SessionError::NoSelection)?;
        let user = self.user_id().ok_or(SessionError::MissingUserId)?;
        Ok(AnswerRequest { user, selected })
    }

    /// Attach the server's verdict to the problem of `generation`.
    ///
    /// Returns `false` if another problem has been loaded since.
    pub fn set_result(&mut self, generation: u64, result: AnswerResult) -> Result<bool, SessionError> {
        let state = self.problem.as_mut().ok_or(SessionError::NoProblem)?;
        if generation != self.generation {
            debug!("dropping result for stale problem {generation}");
            return Ok(false);
        }
        state.result = Some(result);
        Ok(true)
    }
}

impl FormHost for AppShell {
    fn form_mut(&mut self) -> &mut Form {
        &mut self.form
    }
}
