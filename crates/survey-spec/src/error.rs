use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable category of a [`Rejection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum RejectionKind {
    FormNotFound,
    FormNotPublished,
    UnknownQuestionReference,
    DuplicateAnswer,
    MissingRequiredAnswer,
    InvalidAnswerShape,
    InvalidAnswerValue,
    InvalidScaleDefinition,
    InvalidOptionDefinition,
    InvalidLengthDefinition,
    InvalidVisibilityDefinition,
    InvalidSectionOrder,
    InvalidQuestionOrder,
    InvalidQuestionIdentity,
}

impl RejectionKind {
    /// Schema-authoring kinds are raised while a form is being defined,
    /// never while a submission is checked.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            RejectionKind::InvalidScaleDefinition
                | RejectionKind::InvalidOptionDefinition
                | RejectionKind::InvalidLengthDefinition
                | RejectionKind::InvalidVisibilityDefinition
                | RejectionKind::InvalidSectionOrder
                | RejectionKind::InvalidQuestionOrder
                | RejectionKind::InvalidQuestionIdentity
        )
    }
}

/// Reason a form definition or a submission was refused.
///
/// The `Display` output is the human-readable reason handed back to callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("form '{0}' was not found")]
    FormNotFound(String),
    #[error("form '{form_id}' is not published")]
    FormNotPublished { form_id: String },
    #[error("question '{question_id}' does not belong to this form")]
    UnknownQuestionReference { question_id: String },
    #[error("question '{question_id}' was answered more than once")]
    DuplicateAnswer { question_id: String },
    #[error("missing required question {question_id} ('{text}')")]
    MissingRequiredAnswer { question_id: String, text: String },
    #[error("answer to question '{question_id}' must be {expected}, got {found}")]
    InvalidAnswerShape {
        question_id: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid answer to question '{question_id}': {reason}")]
    InvalidAnswerValue { question_id: String, reason: String },
    #[error("question '{question_id}' has an invalid scale: {reason}")]
    InvalidScaleDefinition { question_id: String, reason: String },
    #[error("question '{question_id}' has invalid options: {reason}")]
    InvalidOptionDefinition { question_id: String, reason: String },
    #[error("question '{question_id}' has min_length {min} greater than max_length {max}")]
    InvalidLengthDefinition {
        question_id: String,
        min: usize,
        max: usize,
    },
    #[error("question '{question_id}' has an invalid visibility rule: {reason}")]
    InvalidVisibilityDefinition { question_id: String, reason: String },
    #[error("section order {order} is used more than once")]
    InvalidSectionOrder { order: i32 },
    #[error("question order {order} is used more than once in section '{section_id}'")]
    InvalidQuestionOrder { section_id: String, order: i32 },
    #[error("question id '{question_id}' is invalid: {reason}")]
    InvalidQuestionIdentity { question_id: String, reason: String },
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::FormNotFound(_) => RejectionKind::FormNotFound,
            Rejection::FormNotPublished { .. } => RejectionKind::FormNotPublished,
            Rejection::UnknownQuestionReference { .. } => RejectionKind::UnknownQuestionReference,
            Rejection::DuplicateAnswer { .. } => RejectionKind::DuplicateAnswer,
            Rejection::MissingRequiredAnswer { .. } => RejectionKind::MissingRequiredAnswer,
            Rejection::InvalidAnswerShape { .. } => RejectionKind::InvalidAnswerShape,
            Rejection::InvalidAnswerValue { .. } => RejectionKind::InvalidAnswerValue,
            Rejection::InvalidScaleDefinition { .. } => RejectionKind::InvalidScaleDefinition,
            Rejection::InvalidOptionDefinition { .. } => RejectionKind::InvalidOptionDefinition,
            Rejection::InvalidLengthDefinition { .. } => RejectionKind::InvalidLengthDefinition,
            Rejection::InvalidVisibilityDefinition { .. } => {
                RejectionKind::InvalidVisibilityDefinition
            }
            Rejection::InvalidSectionOrder { .. } => RejectionKind::InvalidSectionOrder,
            Rejection::InvalidQuestionOrder { .. } => RejectionKind::InvalidQuestionOrder,
            Rejection::InvalidQuestionIdentity { .. } => RejectionKind::InvalidQuestionIdentity,
        }
    }

    /// Question the rejection points at, when there is one.
    pub fn question_id(&self) -> Option<&str> {
        match self {
            Rejection::UnknownQuestionReference { question_id }
            | Rejection::DuplicateAnswer { question_id }
            | Rejection::MissingRequiredAnswer { question_id, .. }
            | Rejection::InvalidAnswerShape { question_id, .. }
            | Rejection::InvalidAnswerValue { question_id, .. }
            | Rejection::InvalidScaleDefinition { question_id, .. }
            | Rejection::InvalidOptionDefinition { question_id, .. }
            | Rejection::InvalidLengthDefinition { question_id, .. }
            | Rejection::InvalidVisibilityDefinition { question_id, .. }
            | Rejection::InvalidQuestionIdentity { question_id, .. } => Some(question_id),
            Rejection::FormNotFound(_)
            | Rejection::FormNotPublished { .. }
            | Rejection::InvalidSectionOrder { .. }
            | Rejection::InvalidQuestionOrder { .. } => None,
        }
    }

    pub fn to_report(&self) -> RejectionReport {
        RejectionReport {
            kind: self.kind(),
            reason: self.to_string(),
            question_id: self.question_id().map(str::to_string),
        }
    }
}

/// Serializable form of a [`Rejection`] returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RejectionReport {
    pub kind: RejectionKind,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

impl From<&Rejection> for RejectionReport {
    fn from(rejection: &Rejection) -> Self {
        rejection.to_report()
    }
}
