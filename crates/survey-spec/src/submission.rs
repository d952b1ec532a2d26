use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::answers::{AcceptedResponse, Answer, NetworkContext, ProposedAnswer, SubmissionPayload};
use crate::error::Rejection;
use crate::spec::form::Form;
use crate::spec::question::Question;
use crate::validate::validate_answer;
use crate::visibility::{ProposedValues, is_visible, visible_questions};

/// Runs every submission check against `answers` without building a response.
pub fn check_submission(form: &Form, answers: &[ProposedAnswer]) -> Result<(), Rejection> {
    if !form.is_published() {
        return Err(Rejection::FormNotPublished {
            form_id: form.id.clone(),
        });
    }

    let questions: Vec<&Question> = form.questions().collect();
    let proposed: ProposedValues<'_> = answers
        .iter()
        .map(|answer| (answer.question_id.as_str(), &answer.value))
        .collect();
    let visibility = visible_questions(&questions, &proposed);

    if let Some(missing) = questions.iter().find(|question| {
        question.required
            && is_visible(&visibility, &question.id)
            && !proposed.contains_key(question.id.as_str())
    }) {
        return Err(Rejection::MissingRequiredAnswer {
            question_id: missing.id.clone(),
            text: missing.text.clone(),
        });
    }

    for answer in answers {
        let question = questions
            .iter()
            .find(|question| question.id == answer.question_id)
            .ok_or_else(|| Rejection::UnknownQuestionReference {
                question_id: answer.question_id.clone(),
            })?;
        validate_answer(question, &answer.value)?;
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = answers
        .iter()
        .find(|answer| !seen.insert(answer.question_id.as_str()))
    {
        return Err(Rejection::DuplicateAnswer {
            question_id: duplicate.question_id.clone(),
        });
    }

    debug!(
        form_id = %form.id,
        visible = visibility.values().filter(|visible| **visible).count(),
        answers = answers.len(),
        "submission passed validation"
    );
    Ok(())
}

/// Validates a submission and turns it into a response ready for storage.
///
/// The client address and user id are copied from the request as given.
pub fn accept_submission(
    form: &Form,
    payload: &SubmissionPayload,
    network: &NetworkContext,
) -> Result<AcceptedResponse, Rejection> {
    if let Err(rejection) = check_submission(form, &payload.answers) {
        debug!(form_id = %form.id, kind = ?rejection.kind(), %rejection, "submission rejected");
        return Err(rejection);
    }

    let response = AcceptedResponse {
        id: Uuid::new_v4(),
        form_id: form.id.clone(),
        user_id: payload.user_id.clone(),
        ip_address: network.client_address(),
        submitted_at: Utc::now(),
        answers: payload
            .answers
            .iter()
            .map(|answer| Answer {
                id: Uuid::new_v4(),
                question_id: answer.question_id.clone(),
                value: answer.value.clone(),
            })
            .collect(),
    };

    info!(
        form_id = %form.id,
        response_id = %response.id,
        answers = response.answers.len(),
        "submission accepted"
    );
    Ok(response)
}
