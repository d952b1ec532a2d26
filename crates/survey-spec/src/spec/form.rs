use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Rejection;
use crate::spec::question::Question;
use crate::visibility::find_cycle;

/// Publication state of a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    #[default]
    Draft,
    Published,
}

/// Ordered group of questions inside a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            order: 0,
            questions: Vec::new(),
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = questions;
        self
    }
}

/// Top-level questionnaire definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Form {
    pub id: String,
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: FormStatus,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thank_you_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Form {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: Uuid::new_v4(),
            title: title.into(),
            description: None,
            status: FormStatus::Draft,
            sections: Vec::new(),
            welcome_message: None,
            thank_you_message: None,
            created_by: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    pub fn is_published(&self) -> bool {
        self.status == FormStatus::Published
    }

    pub fn publish(&mut self) {
        self.status = FormStatus::Published;
    }

    pub fn unpublish(&mut self) {
        self.status = FormStatus::Draft;
    }

    /// All questions, section by section, in declaration order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions().find(|question| question.id == question_id)
    }

    /// Checks every authoring invariant of the form and its questions.
    pub fn check_definition(&self) -> Result<(), Rejection> {
        let mut section_orders = BTreeSet::new();
        let mut question_ids = BTreeSet::new();
        for section in &self.sections {
            if !section_orders.insert(section.order) {
                return Err(Rejection::InvalidSectionOrder {
                    order: section.order,
                });
            }

            let mut question_orders = BTreeSet::new();
            for question in &section.questions {
                if question.id.trim().is_empty() {
                    return Err(Rejection::InvalidQuestionIdentity {
                        question_id: question.id.clone(),
                        reason: format!("question '{}' has no id", question.text),
                    });
                }
                if !question_ids.insert(question.id.as_str()) {
                    return Err(Rejection::InvalidQuestionIdentity {
                        question_id: question.id.clone(),
                        reason: "used by more than one question".into(),
                    });
                }
                if !question_orders.insert(question.order) {
                    return Err(Rejection::InvalidQuestionOrder {
                        section_id: section.id.clone(),
                        order: question.order,
                    });
                }
                question.check_definition()?;
            }
        }

        let questions: Vec<&Question> = self.questions().collect();
        if let Some(cycle) = find_cycle(&questions) {
            return Err(Rejection::InvalidVisibilityDefinition {
                question_id: cycle[0].clone(),
                reason: format!("visibility rules form a cycle: {}", cycle.join(" -> ")),
            });
        }

        Ok(())
    }
}
