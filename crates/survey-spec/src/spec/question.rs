use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Rejection;

/// Supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Textarea,
    SingleChoice,
    MultiChoice,
    Rating,
    Scale,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Textarea => "textarea",
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultiChoice => "multi_choice",
            QuestionType::Rating => "rating",
            QuestionType::Scale => "scale",
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }

    pub fn is_scale(&self) -> bool {
        matches!(self, QuestionType::Rating | QuestionType::Scale)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, QuestionType::Text | QuestionType::Textarea)
    }
}

/// One selectable option of a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceOption {
    pub value: String,
    #[serde(rename = "text", alias = "label")]
    pub label: String,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Numeric range of a rating or scale question. `labels[0]` names `min`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScaleSpec {
    pub min: i64,
    pub max: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl Default for ScaleSpec {
    fn default() -> Self {
        Self {
            min: 1,
            max: 5,
            labels: Vec::new(),
        }
    }
}

impl ScaleSpec {
    /// Largest number of points a scale may declare, `0..=100` included.
    pub const MAX_POINTS: i128 = 101;

    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min,
            max,
            labels: Vec::new(),
        }
    }

    /// Configured label for `point`, else the integer itself.
    pub fn label_for(&self, point: i64) -> String {
        usize::try_from(point - self.min)
            .ok()
            .and_then(|index| self.labels.get(index))
            .cloned()
            .unwrap_or_else(|| point.to_string())
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min as f64 && value <= self.max as f64
    }

    /// Number of integer points between `min` and `max` inclusive.
    pub fn points(&self) -> i128 {
        i128::from(self.max) - i128::from(self.min) + 1
    }
}

/// Shows a question only when another question's answer is one of `show_if_in`.
///
/// `depends_on` holds a question id; a prefix of the other question's text is
/// also accepted for forms authored before ids were stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct VisibilityRule {
    #[serde(rename = "dependsOn", default)]
    pub depends_on: String,
    #[serde(rename = "showIfIn", default)]
    pub show_if_in: Vec<String>,
}

impl VisibilityRule {
    pub fn new<I, S>(depends_on: impl Into<String>, show_if_in: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            depends_on: depends_on.into(),
            show_if_in: show_if_in.into_iter().map(Into::into).collect(),
        }
    }

    /// A rule with an empty reference constrains nothing.
    pub fn is_active(&self) -> bool {
        !self.depends_on.trim().is_empty()
    }
}

/// Definition of a single question inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusive_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScaleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityRule>,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>, kind: QuestionType) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind,
            required: false,
            order: 0,
            options: Vec::new(),
            exclusive_options: Vec::new(),
            min_length: None,
            max_length: None,
            scale: None,
            visibility: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_options<I, V, L>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        self.options = options
            .into_iter()
            .map(|(value, label)| ChoiceOption::new(value, label))
            .collect();
        self
    }

    pub fn with_exclusive<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusive_options = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_scale(mut self, scale: ScaleSpec) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_visibility(mut self, rule: VisibilityRule) -> Self {
        self.visibility = Some(rule);
        self
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }

    pub fn option_label(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.label.as_str())
    }

    pub fn is_exclusive(&self, value: &str) -> bool {
        self.exclusive_options.iter().any(|exclusive| exclusive == value)
    }

    /// Scale used for validation and analytics; 1..=5 when none is declared.
    pub fn scale_or_default(&self) -> ScaleSpec {
        self.scale.clone().unwrap_or_default()
    }

    /// Active visibility rule, if any.
    pub fn visibility_rule(&self) -> Option<&VisibilityRule> {
        self.visibility.as_ref().filter(|rule| rule.is_active())
    }

    /// Checks the type-specific invariants of the definition itself.
    pub fn check_definition(&self) -> Result<(), Rejection> {
        if self.kind.is_choice() {
            self.check_options()?;
        }

        if self.kind.is_scale() {
            let scale = self
                .scale
                .as_ref()
                .ok_or_else(|| Rejection::InvalidScaleDefinition {
                    question_id: self.id.clone(),
                    reason: format!("{} questions must declare a scale", self.kind.as_str()),
                })?;
            if scale.min >= scale.max {
                return Err(Rejection::InvalidScaleDefinition {
                    question_id: self.id.clone(),
                    reason: format!(
                        "min {} must be less than max {}",
                        scale.min, scale.max
                    ),
                });
            }
            if scale.points() > ScaleSpec::MAX_POINTS {
                return Err(Rejection::InvalidScaleDefinition {
                    question_id: self.id.clone(),
                    reason: format!(
                        "scale {}..{} has {} points, at most {} are allowed",
                        scale.min,
                        scale.max,
                        scale.points(),
                        ScaleSpec::MAX_POINTS
                    ),
                });
            }
        }

        if self.kind.is_text()
            && let (Some(min), Some(max)) = (self.min_length, self.max_length)
            && min > max
        {
            return Err(Rejection::InvalidLengthDefinition {
                question_id: self.id.clone(),
                min,
                max,
            });
        }

        Ok(())
    }

    fn check_options(&self) -> Result<(), Rejection> {
        let invalid = |reason: String| Rejection::InvalidOptionDefinition {
            question_id: self.id.clone(),
            reason,
        };

        if self.options.is_empty() {
            return Err(invalid(format!(
                "{} questions must have at least one option",
                self.kind.as_str()
            )));
        }

        let mut seen = BTreeSet::new();
        for option in &self.options {
            if option.value.is_empty() {
                return Err(invalid("option values cannot be empty".into()));
            }
            if !seen.insert(option.value.as_str()) {
                return Err(invalid(format!(
                    "option value '{}' is declared twice",
                    option.value
                )));
            }
        }

        if let Some(unknown) = self
            .exclusive_options
            .iter()
            .find(|exclusive| !seen.contains(exclusive.as_str()))
        {
            return Err(invalid(format!(
                "exclusive value '{}' is not one of the options",
                unknown
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectionKind;

    #[test]
    fn choice_question_without_options_is_rejected() {
        let question = Question::new("q1", "Pick one", QuestionType::SingleChoice);
        let err = question.check_definition().unwrap_err();
        assert_eq!(err.kind(), RejectionKind::InvalidOptionDefinition);
    }

    #[test]
    fn duplicate_option_values_are_rejected() {
        let question = Question::new("q1", "Pick", QuestionType::MultiChoice)
            .with_options([("a", "A"), ("a", "Also A")]);
        let err = question.check_definition().unwrap_err();
        assert_eq!(err.kind(), RejectionKind::InvalidOptionDefinition);
    }

    #[test]
    fn exclusive_value_must_be_declared() {
        let question = Question::new("q1", "Pick", QuestionType::MultiChoice)
            .with_options([("a", "A")])
            .with_exclusive(["none"]);
        let err = question.check_definition().unwrap_err();
        assert!(err.to_string().contains("none"));
    }

    #[test]
    fn scale_requires_min_below_max() {
        let missing = Question::new("q1", "Rate", QuestionType::Rating);
        assert_eq!(
            missing.check_definition().unwrap_err().kind(),
            RejectionKind::InvalidScaleDefinition
        );

        let inverted =
            Question::new("q1", "Rate", QuestionType::Scale).with_scale(ScaleSpec::new(5, 5));
        assert_eq!(
            inverted.check_definition().unwrap_err().kind(),
            RejectionKind::InvalidScaleDefinition
        );

        let valid =
            Question::new("q1", "Rate", QuestionType::Scale).with_scale(ScaleSpec::new(0, 10));
        assert!(valid.check_definition().is_ok());
    }

    #[test]
    fn scale_span_is_bounded() {
        let widest =
            Question::new("q1", "Rate", QuestionType::Scale).with_scale(ScaleSpec::new(0, 100));
        assert!(widest.check_definition().is_ok());

        let too_wide =
            Question::new("q1", "Rate", QuestionType::Scale).with_scale(ScaleSpec::new(0, 101));
        assert_eq!(
            too_wide.check_definition().unwrap_err().kind(),
            RejectionKind::InvalidScaleDefinition
        );

        let huge = Question::new("q1", "Rate", QuestionType::Rating)
            .with_scale(ScaleSpec::new(i64::MIN, i64::MAX));
        let err = huge.check_definition().unwrap_err();
        assert_eq!(err.kind(), RejectionKind::InvalidScaleDefinition);
        assert!(err.to_string().contains("at most 101"));
    }

    #[test]
    fn text_bounds_must_be_ordered() {
        let question =
            Question::new("q1", "Tell us", QuestionType::Text).with_length(Some(10), Some(3));
        assert_eq!(
            question.check_definition().unwrap_err().kind(),
            RejectionKind::InvalidLengthDefinition
        );
    }

    #[test]
    fn scale_labels_index_from_min() {
        let scale = ScaleSpec {
            min: 0,
            max: 3,
            labels: vec!["never".into(), "rarely".into()],
        };
        assert_eq!(scale.label_for(0), "never");
        assert_eq!(scale.label_for(1), "rarely");
        assert_eq!(scale.label_for(2), "2");
    }

    #[test]
    fn options_accept_label_alias() {
        let question: Question = serde_json::from_value(serde_json::json!({
            "id": "q1",
            "text": "Pick",
            "type": "single_choice",
            "options": [{ "value": "a", "label": "Alpha" }, { "value": "b", "text": "Beta" }]
        }))
        .expect("deserialize");
        assert_eq!(question.option_label("a"), Some("Alpha"));
        assert_eq!(question.option_label("b"), Some("Beta"));
    }
}
