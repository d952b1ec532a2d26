//! Per-question aggregate reports over stored answers.
//!
//! Every builder is total: empty or malformed answer sets produce zeroed
//! reports, never an error. Accumulators live only for one call.

mod choice;
mod scale;
mod text;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::{AcceptedResponse, AnswerValue};
use crate::spec::form::Form;
use crate::spec::question::{Question, QuestionType};

pub use choice::{ChoiceReport, CoOccurrenceRow, DistributionRow, MultiChoiceReport};
pub use scale::{ScaleBucket, ScaleReport, ScaleStatistics};
pub use text::{TextReport, WordCount, tokenize};

/// Cut-offs for the text reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisLimits {
    pub short_text_top: usize,
    pub short_text_cloud: usize,
    pub long_text_top: usize,
    pub long_text_cloud: usize,
    pub long_text_samples: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            short_text_top: 20,
            short_text_cloud: 10,
            long_text_top: 30,
            long_text_cloud: 15,
            long_text_samples: 5,
        }
    }
}

/// Aggregate output for one question, shaped by its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    SingleChoice(ChoiceReport),
    MultiChoice(MultiChoiceReport),
    Scale(ScaleReport),
    Text(TextReport),
}

impl Report {
    /// Number of answers the report was built from.
    pub fn total(&self) -> usize {
        match self {
            Report::SingleChoice(report) => report.total,
            Report::MultiChoice(report) => report.total_responses,
            Report::Scale(report) => report.total,
            Report::Text(report) => report.total,
        }
    }
}

/// Builds the report for `question` with the default limits.
pub fn analyze<'a, I>(question: &Question, answers: I) -> Report
where
    I: IntoIterator<Item = &'a AnswerValue>,
{
    analyze_with_limits(question, answers, &AnalysisLimits::default())
}

pub fn analyze_with_limits<'a, I>(question: &Question, answers: I, limits: &AnalysisLimits) -> Report
where
    I: IntoIterator<Item = &'a AnswerValue>,
{
    let answers: Vec<&AnswerValue> = answers.into_iter().collect();
    match question.kind {
        QuestionType::SingleChoice => Report::SingleChoice(choice::single_choice(question, &answers)),
        QuestionType::MultiChoice => Report::MultiChoice(choice::multi_choice(question, &answers)),
        QuestionType::Rating | QuestionType::Scale => {
            Report::Scale(scale::rating_scale(question, &answers))
        }
        QuestionType::Text => Report::Text(text::short_text(
            &answers,
            limits.short_text_top,
            limits.short_text_cloud,
        )),
        QuestionType::Textarea => Report::Text(text::long_text(
            &answers,
            limits.long_text_top,
            limits.long_text_cloud,
            limits.long_text_samples,
        )),
    }
}

/// Report for one question of a form, with the question's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionAnalysis {
    pub question_id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub total_answers: usize,
    pub data: Report,
}

/// Reports for every question of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormAnalysis {
    pub total_responses: usize,
    pub questions: Vec<QuestionAnalysis>,
}

/// Analyses every question of `form` over the responses submitted to it.
///
/// Responses to other forms are ignored. With no responses the question list
/// is empty.
pub fn analyze_form(
    form: &Form,
    responses: &[AcceptedResponse],
    limits: &AnalysisLimits,
) -> FormAnalysis {
    let responses: Vec<&AcceptedResponse> = responses
        .iter()
        .filter(|response| response.form_id == form.id)
        .collect();

    if responses.is_empty() {
        return FormAnalysis {
            total_responses: 0,
            questions: Vec::new(),
        };
    }

    let questions = form
        .questions()
        .map(|question| {
            let answers: Vec<&AnswerValue> = responses
                .iter()
                .flat_map(|response| response.answers.iter())
                .filter(|answer| answer.question_id == question.id)
                .map(|answer| &answer.value)
                .collect();
            QuestionAnalysis {
                question_id: question.id.clone(),
                question_text: question.text.clone(),
                question_type: question.kind,
                total_answers: answers.len(),
                data: analyze_with_limits(question, answers, limits),
            }
        })
        .collect();

    FormAnalysis {
        total_responses: responses.len(),
        questions,
    }
}

/// `part / total * 100`, rounded to one decimal; 0 when `total` is 0.
pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(part as f64 / total as f64 * 100.0, 1)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
