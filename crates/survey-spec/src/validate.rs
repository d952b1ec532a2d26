use crate::answers::AnswerValue;
use crate::error::Rejection;
use crate::spec::question::{Question, QuestionType};

/// Checks one candidate value against its question definition.
///
/// Shape is checked before content; the first failure is returned.
pub fn validate_answer(question: &Question, value: &AnswerValue) -> Result<(), Rejection> {
    match question.kind {
        QuestionType::SingleChoice => {
            let choice = expect_text(question, value)?;
            if !question.has_option(choice) {
                return Err(invalid_value(
                    question,
                    format!(
                        "'{}' is not one of: {}",
                        choice,
                        option_list(question)
                    ),
                ));
            }
        }
        QuestionType::MultiChoice => {
            let choices = value.as_choices().ok_or_else(|| shape_error(
                question,
                "a list of strings",
                value,
            ))?;
            if let Some(unknown) = choices.iter().find(|choice| !question.has_option(choice)) {
                return Err(invalid_value(
                    question,
                    format!("'{}' is not one of: {}", unknown, option_list(question)),
                ));
            }
            if choices.len() != 1
                && let Some(exclusive) = choices.iter().find(|choice| question.is_exclusive(choice))
            {
                return Err(invalid_value(
                    question,
                    format!(
                        "option '{}' is exclusive and cannot be selected with other options",
                        exclusive
                    ),
                ));
            }
        }
        QuestionType::Rating | QuestionType::Scale => {
            let number = value
                .as_number()
                .ok_or_else(|| shape_error(question, "a number", value))?;
            let scale = question.scale_or_default();
            if !number.is_finite() || !scale.contains(number) {
                return Err(invalid_value(
                    question,
                    format!("value must be between {} and {}", scale.min, scale.max),
                ));
            }
            if number.fract() != 0.0 {
                return Err(invalid_value(
                    question,
                    format!("value {} must be a whole number", number),
                ));
            }
        }
        QuestionType::Text | QuestionType::Textarea => {
            let text = expect_text(question, value)?;
            let length = text.chars().count();
            if let Some(min) = question.min_length
                && length < min
            {
                return Err(invalid_value(
                    question,
                    format!("text must be at least {} characters", min),
                ));
            }
            if let Some(max) = question.max_length
                && length > max
            {
                return Err(invalid_value(
                    question,
                    format!("text must be at most {} characters", max),
                ));
            }
        }
    }

    Ok(())
}

fn expect_text<'v>(question: &Question, value: &'v AnswerValue) -> Result<&'v str, Rejection> {
    value
        .as_text()
        .ok_or_else(|| shape_error(question, "a string", value))
}

fn shape_error(question: &Question, expected: &'static str, value: &AnswerValue) -> Rejection {
    Rejection::InvalidAnswerShape {
        question_id: question.id.clone(),
        expected,
        found: value.shape(),
    }
}

fn invalid_value(question: &Question, reason: String) -> Rejection {
    Rejection::InvalidAnswerValue {
        question_id: question.id.clone(),
        reason,
    }
}

fn option_list(question: &Question) -> String {
    question
        .options
        .iter()
        .map(|option| option.value.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
