//! Applies nested form edits: children missing from an update are deleted,
//! children with a known id are updated in place, the rest are created.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::spec::form::{Form, FormStatus, Section};
use crate::spec::question::Question;

/// Something with an optional persistent key.
pub trait Keyed {
    /// `None` for entries that have not been stored yet.
    fn key(&self) -> Option<&str>;
}

impl Keyed for Question {
    fn key(&self) -> Option<&str> {
        Some(self.id.as_str()).filter(|id| !id.is_empty())
    }
}

impl Keyed for Section {
    fn key(&self) -> Option<&str> {
        Some(self.id.as_str()).filter(|id| !id.is_empty())
    }
}

impl Keyed for SectionUpdate {
    fn key(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Three-way diff between stored children and an incoming list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ChangeSet {
    /// Positions in the incoming list that become new children.
    pub additions: Vec<usize>,
    /// Ids of stored children that are updated.
    pub updates: Vec<String>,
    /// Ids of stored children that are deleted.
    pub removals: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.updates.is_empty() && self.removals.is_empty()
    }
}

/// Diffs `existing` against `incoming` by key.
///
/// Incoming entries without a key, or whose key is not stored, are additions.
/// A stored key is updated once; later entries repeating it are additions too.
pub fn plan<'e, E, T>(existing: E, incoming: &[T]) -> ChangeSet
where
    E: IntoIterator<Item = &'e str>,
    T: Keyed,
{
    let existing: Vec<&str> = existing.into_iter().collect();
    let stored: HashSet<&str> = existing.iter().copied().collect();
    let kept: HashSet<&str> = incoming
        .iter()
        .filter_map(Keyed::key)
        .filter(|key| stored.contains(key))
        .collect();

    let mut claimed = HashSet::new();
    let mut changes = ChangeSet::default();
    for (position, entry) in incoming.iter().enumerate() {
        match entry
            .key()
            .filter(|key| stored.contains(key) && claimed.insert(*key))
        {
            Some(key) => changes.updates.push(key.to_string()),
            None => changes.additions.push(position),
        }
    }
    changes.removals = existing
        .into_iter()
        .filter(|id| !kept.contains(id))
        .map(str::to_string)
        .collect();
    changes
}

/// Incoming edit of a section. `questions: None` leaves the questions alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
}

/// Incoming edit of a form. Absent fields are left unchanged.
///
/// An empty welcome or thank-you message clears the stored one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct FormUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FormStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thank_you_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SectionUpdate>>,
}

fn drop_blank(questions: Vec<Question>) -> Vec<Question> {
    questions
        .into_iter()
        .filter(|question| !question.text.trim().is_empty())
        .collect()
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

fn non_empty(message: String) -> Option<String> {
    Some(message).filter(|message| !message.is_empty())
}

/// Replaces `section`'s questions with `incoming`, keeping ids that match.
pub fn apply_questions(section: &mut Section, incoming: Vec<Question>) -> ChangeSet {
    let incoming = drop_blank(incoming);
    let changes = plan(
        section.questions.iter().map(|question| question.id.as_str()),
        &incoming,
    );
    let additions: HashSet<usize> = changes.additions.iter().copied().collect();

    section.questions = incoming
        .into_iter()
        .enumerate()
        .map(|(position, mut question)| {
            if additions.contains(&position) {
                question.id = fresh_id();
            }
            question
        })
        .collect();

    debug!(
        section_id = %section.id,
        added = changes.additions.len(),
        updated = changes.updates.len(),
        removed = changes.removals.len(),
        "questions reconciled"
    );
    changes
}

fn new_section(update: SectionUpdate) -> Section {
    let questions = drop_blank(update.questions.unwrap_or_default())
        .into_iter()
        .map(|mut question| {
            question.id = fresh_id();
            question
        })
        .collect();
    Section {
        id: fresh_id(),
        title: update.title,
        description: update.description,
        order: update.order,
        questions,
    }
}

/// Applies `update` to `form` and returns the section-level change set.
pub fn apply_form_update(form: &mut Form, update: FormUpdate) -> ChangeSet {
    if let Some(title) = update.title {
        form.title = title;
    }
    if let Some(description) = update.description {
        form.description = non_empty(description);
    }
    if let Some(status) = update.status {
        form.status = status;
    }
    if let Some(message) = update.welcome_message {
        form.welcome_message = non_empty(message);
    }
    if let Some(message) = update.thank_you_message {
        form.thank_you_message = non_empty(message);
    }

    let Some(incoming) = update.sections else {
        return ChangeSet::default();
    };

    let changes = plan(
        form.sections.iter().map(|section| section.id.as_str()),
        &incoming,
    );
    let additions: HashSet<usize> = changes.additions.iter().copied().collect();
    let mut stored = std::mem::take(&mut form.sections);

    form.sections = incoming
        .into_iter()
        .enumerate()
        .map(|(position, update)| {
            if additions.contains(&position) {
                return new_section(update);
            }
            let slot = stored
                .iter()
                .position(|section| Some(section.id.as_str()) == update.key());
            match slot {
                Some(slot) => {
                    let mut section = stored.swap_remove(slot);
                    section.title = update.title;
                    section.description = update.description;
                    section.order = update.order;
                    if let Some(questions) = update.questions {
                        apply_questions(&mut section, questions);
                    }
                    section
                }
                None => new_section(update),
            }
        })
        .collect();

    debug!(
        form_id = %form.id,
        added = changes.additions.len(),
        updated = changes.updates.len(),
        removed = changes.removals.len(),
        "sections reconciled"
    );
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::question::QuestionType;

    fn question(id: &str, text: &str) -> Question {
        Question::new(id, text, QuestionType::Text)
    }

    #[test]
    fn plan_splits_additions_updates_and_removals() {
        let incoming = vec![question("b", "B"), question("", "New"), question("zz", "Unknown id")];
        let changes = plan(["a", "b", "c"], &incoming);
        assert_eq!(changes.updates, vec!["b"]);
        assert_eq!(changes.additions, vec![1, 2]);
        assert_eq!(changes.removals, vec!["a", "c"]);
    }

    #[test]
    fn repeated_key_is_updated_once() {
        let incoming = vec![question("b", "B"), question("b", "B again")];
        let changes = plan(["a", "b"], &incoming);
        assert_eq!(changes.updates, vec!["b"]);
        assert_eq!(changes.additions, vec![1]);
        assert_eq!(changes.removals, vec!["a"]);
    }

    #[test]
    fn repeated_question_ids_end_up_unique() {
        let mut section = Section::new("s", "Section").with_questions(vec![question("q", "Q")]);
        apply_questions(
            &mut section,
            vec![question("q", "Text"), question("q", "Choice")],
        );
        assert_eq!(section.questions.len(), 2);
        assert_eq!(section.questions[0].id, "q");
        assert_ne!(section.questions[1].id, "q");
        assert_eq!(section.questions[1].text, "Choice");
    }

    #[test]
    fn missing_questions_are_deleted() {
        let mut section = Section::new("s", "Section")
            .with_questions(vec![question("a", "First"), question("b", "Second")]);
        let changes = apply_questions(&mut section, vec![question("b", "Second, edited")]);
        assert_eq!(changes.removals, vec!["a"]);
        assert_eq!(section.questions.len(), 1);
        assert_eq!(section.questions[0].id, "b");
        assert_eq!(section.questions[0].text, "Second, edited");
    }

    #[test]
    fn blank_questions_are_skipped_and_new_ones_get_ids() {
        let mut section = Section::new("s", "Section");
        let changes = apply_questions(&mut section, vec![question("", "  "), question("", "Fresh")]);
        assert_eq!(changes.additions, vec![0]);
        assert_eq!(section.questions.len(), 1);
        assert!(!section.questions[0].id.is_empty());
    }

    #[test]
    fn form_update_reconciles_sections() {
        let mut form = Form::new("f", "Survey").with_sections(vec![
            Section::new("keep", "Keep").with_questions(vec![question("q1", "Q1")]),
            Section::new("drop", "Drop").with_order(1),
        ]);
        let update = FormUpdate {
            title: Some("Renamed".into()),
            welcome_message: Some(String::new()),
            sections: Some(vec![
                SectionUpdate {
                    id: Some("keep".into()),
                    title: "Kept".into(),
                    description: None,
                    order: 0,
                    questions: None,
                },
                SectionUpdate {
                    id: None,
                    title: "Added".into(),
                    description: None,
                    order: 1,
                    questions: Some(vec![question("ignored", "New question")]),
                },
            ]),
            ..FormUpdate::default()
        };

        let changes = apply_form_update(&mut form, update);
        assert_eq!(changes.removals, vec!["drop"]);
        assert_eq!(form.title, "Renamed");
        assert_eq!(form.welcome_message, None);
        assert_eq!(form.sections.len(), 2);
        assert_eq!(form.sections[0].title, "Kept");
        assert_eq!(form.sections[0].questions[0].id, "q1");
        assert_ne!(form.sections[1].questions[0].id, "ignored");
    }

    #[test]
    fn absent_sections_leave_form_tree_alone() {
        let mut form = Form::new("f", "Survey").with_sections(vec![Section::new("s", "S")]);
        let changes = apply_form_update(&mut form, FormUpdate::default());
        assert!(changes.is_empty());
        assert_eq!(form.sections.len(), 1);
    }
}
