use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::answers::{AcceptedResponse, Answer};
use crate::spec::form::Form;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("form '{0}' was not found")]
    FormNotFound(String),
    #[error("question '{0}' was not found")]
    QuestionNotFound(String),
    #[error("response '{0}' was not found")]
    ResponseNotFound(String),
}

/// Read access to stored form trees.
pub trait FormSource {
    /// Any form by id, draft or published.
    fn form(&self, form_id: &str) -> Result<&Form, StoreError>;

    /// Public lookup; drafts are reported as missing.
    fn published_by_uuid(&self, uuid: &Uuid) -> Result<&Form, StoreError>;
}

/// Append-only storage of accepted responses.
pub trait AnswerStore {
    fn append(&mut self, response: AcceptedResponse);

    fn responses_for(&self, form_id: &str) -> Vec<&AcceptedResponse>;

    /// Every stored answer to `question_id`, in submission order.
    fn answers_for(&self, question_id: &str) -> Vec<&Answer>;
}

/// In-memory store backing the component surface and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    forms: BTreeMap<String, Form>,
    responses: Vec<AcceptedResponse>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(form: Form) -> Self {
        let mut store = Self::default();
        store.insert_form(form);
        store
    }

    /// Inserts or replaces a form.
    pub fn insert_form(&mut self, form: Form) {
        self.forms.insert(form.id.clone(), form);
    }

    /// Finds a form by id, or by public uuid when it is published.
    pub fn resolve(&self, form_ref: &str) -> Result<&Form, StoreError> {
        if let Ok(form) = self.form(form_ref) {
            return Ok(form);
        }
        Uuid::parse_str(form_ref)
            .map_err(|_| StoreError::FormNotFound(form_ref.to_string()))
            .and_then(|uuid| self.published_by_uuid(&uuid))
    }

    /// Finds the form owning `question_id`.
    pub fn form_for_question(&self, question_id: &str) -> Result<&Form, StoreError> {
        self.forms
            .values()
            .find(|form| form.question(question_id).is_some())
            .ok_or_else(|| StoreError::QuestionNotFound(question_id.to_string()))
    }

    pub fn responses(&self) -> &[AcceptedResponse] {
        &self.responses
    }

    /// Finds a stored response by its uuid.
    pub fn response(&self, response_id: &str) -> Result<&AcceptedResponse, StoreError> {
        let missing = || StoreError::ResponseNotFound(response_id.to_string());
        let id = Uuid::parse_str(response_id).map_err(|_| missing())?;
        self.responses
            .iter()
            .find(|response| response.id == id)
            .ok_or_else(missing)
    }
}

impl FormSource for MemoryStore {
    fn form(&self, form_id: &str) -> Result<&Form, StoreError> {
        self.forms
            .get(form_id)
            .ok_or_else(|| StoreError::FormNotFound(form_id.to_string()))
    }

    fn published_by_uuid(&self, uuid: &Uuid) -> Result<&Form, StoreError> {
        self.forms
            .values()
            .find(|form| form.uuid == *uuid && form.is_published())
            .ok_or_else(|| StoreError::FormNotFound(uuid.to_string()))
    }
}

impl AnswerStore for MemoryStore {
    fn append(&mut self, response: AcceptedResponse) {
        debug!(
            form_id = %response.form_id,
            response_id = %response.id,
            "response stored"
        );
        self.responses.push(response);
    }

    fn responses_for(&self, form_id: &str) -> Vec<&AcceptedResponse> {
        self.responses
            .iter()
            .filter(|response| response.form_id == form_id)
            .collect()
    }

    fn answers_for(&self, question_id: &str) -> Vec<&Answer> {
        self.responses
            .iter()
            .flat_map(|response| response.answers.iter())
            .filter(|answer| answer.question_id == question_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::AnswerValue;
    use chrono::Utc;

    fn response(form_id: &str, question_id: &str, value: &str) -> AcceptedResponse {
        AcceptedResponse {
            id: Uuid::new_v4(),
            form_id: form_id.into(),
            user_id: None,
            ip_address: None,
            submitted_at: Utc::now(),
            answers: vec![Answer {
                id: Uuid::new_v4(),
                question_id: question_id.into(),
                value: AnswerValue::from(value),
            }],
        }
    }

    #[test]
    fn drafts_are_hidden_from_public_lookup() {
        let mut form = Form::new("f", "Survey");
        let uuid = form.uuid;
        let mut store = MemoryStore::with_form(form.clone());
        assert_eq!(
            store.published_by_uuid(&uuid),
            Err(StoreError::FormNotFound(uuid.to_string()))
        );

        form.publish();
        store.insert_form(form);
        assert_eq!(store.published_by_uuid(&uuid).map(|f| f.id.as_str()), Ok("f"));
        assert_eq!(store.resolve(&uuid.to_string()).map(|f| f.id.as_str()), Ok("f"));
        assert!(store.resolve("missing").is_err());
    }

    #[test]
    fn answers_are_collected_per_question() {
        let mut store = MemoryStore::new();
        store.append(response("f", "q1", "a"));
        store.append(response("f", "q2", "b"));
        store.append(response("g", "q1", "c"));

        assert_eq!(store.responses_for("f").len(), 2);
        let values: Vec<&str> = store
            .answers_for("q1")
            .iter()
            .filter_map(|answer| answer.value.as_text())
            .collect();
        assert_eq!(values, vec!["a", "c"]);
    }

    #[test]
    fn responses_are_found_by_uuid() {
        let mut store = MemoryStore::new();
        let stored = response("f", "q1", "a");
        let id = stored.id;
        store.append(stored);

        assert_eq!(store.response(&id.to_string()).map(|r| r.id), Ok(id));
        let other = Uuid::new_v4().to_string();
        assert_eq!(
            store.response(&other),
            Err(StoreError::ResponseNotFound(other.clone()))
        );
        assert_eq!(
            store.response("not-a-uuid"),
            Err(StoreError::ResponseNotFound("not-a-uuid".into()))
        );
    }
}
