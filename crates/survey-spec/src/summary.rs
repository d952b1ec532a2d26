use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::{AcceptedResponse, AnswerValue};
use crate::spec::form::Form;
use crate::spec::question::QuestionType;

/// Question labels that suggest the respondent's name (English, Persian, Arabic).
const NAME_KEYWORDS: [&str; 3] = ["name", "نام", "اسم"];

/// Listing entry for a stored response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseSummary {
    pub id: Uuid,
    pub form_id: String,
    pub form_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub answer_count: usize,
    pub display_name: String,
}

impl ResponseSummary {
    pub fn from_response(form: &Form, response: &AcceptedResponse) -> Self {
        Self {
            id: response.id,
            form_id: response.form_id.clone(),
            form_title: form.title.clone(),
            user_id: response.user_id.clone(),
            submitted_at: response.submitted_at,
            answer_count: response.answers.len(),
            display_name: display_name(form, response),
        }
    }
}

/// First non-empty answer to a name-like question, then the user id, then
/// the response id.
fn display_name(form: &Form, response: &AcceptedResponse) -> String {
    response
        .answers
        .iter()
        .filter(|answer| !answer.value.is_empty())
        .find(|answer| {
            form.question(&answer.question_id).is_some_and(|question| {
                let label = question.text.to_lowercase();
                NAME_KEYWORDS.iter().any(|keyword| label.contains(keyword))
            })
        })
        .map(|answer| answer.value.display())
        .or_else(|| response.user_id.clone())
        .unwrap_or_else(|| format!("Response #{}", response.id))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerDetail {
    pub question_id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub value: AnswerValue,
}

/// Full view of one response with each answer's question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseDetail {
    pub id: Uuid,
    pub form_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<AnswerDetail>,
}

impl ResponseDetail {
    /// Answers whose question no longer exists in `form` are left out.
    pub fn from_response(form: &Form, response: &AcceptedResponse) -> Self {
        let answers = response
            .answers
            .iter()
            .filter_map(|answer| {
                form.question(&answer.question_id).map(|question| AnswerDetail {
                    question_id: question.id.clone(),
                    question_text: question.text.clone(),
                    question_type: question.kind,
                    value: answer.value.clone(),
                })
            })
            .collect();

        Self {
            id: response.id,
            form_id: response.form_id.clone(),
            user_id: response.user_id.clone(),
            ip_address: response.ip_address.clone(),
            submitted_at: response.submitted_at,
            answers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::Answer;
    use crate::spec::form::Section;
    use crate::spec::question::Question;

    fn form() -> Form {
        Form::new("f", "Customer survey").with_sections(vec![Section::new("s", "About you")
            .with_questions(vec![
                Question::new("q1", "How did you find us?", QuestionType::Text),
                Question::new("q2", "Your full name", QuestionType::Text).with_order(1),
            ])])
    }

    fn response(answers: Vec<(&str, &str)>, user_id: Option<&str>) -> AcceptedResponse {
        AcceptedResponse {
            id: Uuid::new_v4(),
            form_id: "f".into(),
            user_id: user_id.map(str::to_string),
            ip_address: None,
            submitted_at: Utc::now(),
            answers: answers
                .into_iter()
                .map(|(question_id, value)| Answer {
                    id: Uuid::new_v4(),
                    question_id: question_id.into(),
                    value: AnswerValue::from(value),
                })
                .collect(),
        }
    }

    #[test]
    fn display_name_prefers_name_answer() {
        let r = response(vec![("q1", "search"), ("q2", "Dana")], Some("user-7"));
        let summary = ResponseSummary::from_response(&form(), &r);
        assert_eq!(summary.display_name, "Dana");
        assert_eq!(summary.answer_count, 2);
        assert_eq!(summary.form_title, "Customer survey");
    }

    #[test]
    fn display_name_falls_back_to_user_then_id() {
        let with_user = response(vec![("q1", "search")], Some("user-7"));
        assert_eq!(
            ResponseSummary::from_response(&form(), &with_user).display_name,
            "user-7"
        );

        let anonymous = response(vec![("q2", "")], None);
        let summary = ResponseSummary::from_response(&form(), &anonymous);
        assert_eq!(summary.display_name, format!("Response #{}", anonymous.id));
    }

    #[test]
    fn detail_joins_question_metadata() {
        let r = response(vec![("q2", "Dana"), ("gone", "x")], None);
        let detail = ResponseDetail::from_response(&form(), &r);
        assert_eq!(detail.answers.len(), 1);
        assert_eq!(detail.answers[0].question_text, "Your full name");
        assert_eq!(detail.answers[0].question_type, QuestionType::Text);
    }
}
