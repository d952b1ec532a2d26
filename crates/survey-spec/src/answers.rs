use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};
use serde_json::Value;
use uuid::Uuid;

/// Raw answer value as submitted.
///
/// Which variant is acceptable depends on the type of the question it answers;
/// anything that fits none of the known shapes lands in `Other` so it can be
/// rejected with a shape error instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
    Choices(Vec<String>),
    Other(Value),
}

impl AnswerValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Choices(choices) => Some(choices),
            _ => None,
        }
    }

    /// Short description of the shape, used in rejection reasons.
    pub fn shape(&self) -> &'static str {
        match self {
            AnswerValue::Number(_) => "a number",
            AnswerValue::Text(_) => "a string",
            AnswerValue::Choices(_) => "a list of strings",
            AnswerValue::Other(Value::Null) => "null",
            AnswerValue::Other(Value::Bool(_)) => "a boolean",
            AnswerValue::Other(Value::Array(_)) => "a list with non-string items",
            AnswerValue::Other(_) => "an object",
        }
    }

    /// Display form used by response summaries.
    pub fn display(&self) -> String {
        match self {
            AnswerValue::Number(number) => number.to_string(),
            AnswerValue::Text(text) => text.clone(),
            AnswerValue::Choices(choices) => choices.join(", "),
            AnswerValue::Other(value) => value.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.is_empty(),
            AnswerValue::Choices(choices) => choices.is_empty(),
            AnswerValue::Other(Value::Null) => true,
            _ => false,
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        AnswerValue::Number(value)
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(values: Vec<&str>) -> Self {
        AnswerValue::Choices(values.into_iter().map(str::to_string).collect())
    }
}

/// One entry of an incoming submission payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProposedAnswer {
    pub question_id: String,
    pub value: AnswerValue,
}

impl ProposedAnswer {
    pub fn new(question_id: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        Self {
            question_id: question_id.into(),
            value: value.into(),
        }
    }
}

/// Body of a submission request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SubmissionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub answers: Vec<ProposedAnswer>,
}

impl SubmissionPayload {
    pub fn new(answers: Vec<ProposedAnswer>) -> Self {
        Self {
            user_id: None,
            answers,
        }
    }
}

/// Transport metadata observed for a submission. Carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct NetworkContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_addr: Option<String>,
}

impl NetworkContext {
    /// First forwarded-for entry when present, else the direct peer address.
    pub fn client_address(&self) -> Option<String> {
        self.forwarded_for
            .as_deref()
            .and_then(|header| header.split(',').next())
            .map(str::trim)
            .filter(|first| !first.is_empty())
            .or_else(|| self.peer_addr.as_deref())
            .map(str::to_string)
    }
}

/// A stored answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: String,
    pub value: AnswerValue,
}

/// A validated submission, ready for the answer store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AcceptedResponse {
    pub id: Uuid,
    pub form_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl AcceptedResponse {
    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.answers
            .iter()
            .find(|answer| answer.question_id == question_id)
    }

    /// Serializes the response as canonical CBOR bytes for archival.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }

    /// Serializes the response as indented JSON for debugging.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
