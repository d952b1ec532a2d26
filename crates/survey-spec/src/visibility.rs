use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::answers::AnswerValue;
use crate::spec::question::Question;

/// Visibility of every question, keyed by question id.
pub type VisibilityMap = BTreeMap<String, bool>;

/// Candidate answers keyed by question id.
pub type ProposedValues<'a> = HashMap<&'a str, &'a AnswerValue>;

/// Finds the question a visibility reference points at.
///
/// Identity wins. Failing that, the reference is matched as a prefix of the
/// question text; forms authored before questions had stable ids still use
/// that form. A question never resolves to itself.
pub fn resolve_reference<'q>(
    questions: &[&'q Question],
    subject: &Question,
    reference: &str,
) -> Option<&'q Question> {
    let others = || questions.iter().copied().filter(|q| q.id != subject.id);
    others().find(|q| q.id == reference).or_else(|| {
        let legacy = others().find(|q| q.text.starts_with(reference));
        if let Some(target) = legacy {
            debug!(
                question_id = %subject.id,
                reference,
                resolved = %target.id,
                "visibility reference resolved by text prefix"
            );
        }
        legacy
    })
}

#[derive(Clone, Copy)]
enum Mark {
    Visiting,
    Done(bool),
}

/// Computes which questions are visible for the proposed answers.
///
/// A question without a rule is visible. A question with a rule is visible
/// when the referenced question is itself visible and its proposed answer is
/// one of the listed values. Rules are followed in dependency order. References
/// that resolve to nothing, and questions caught in a cycle, stay visible.
pub fn visible_questions(questions: &[&Question], proposed: &ProposedValues<'_>) -> VisibilityMap {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for id in cycle_members(questions) {
        warn!(question_id = %id, "visibility cycle detected; showing question");
        marks.insert(id, Mark::Done(true));
    }

    let mut map = VisibilityMap::new();
    for question in questions {
        let visible = evaluate(question, questions, proposed, &mut marks);
        map.insert(question.id.clone(), visible);
    }
    map
}

fn evaluate<'q>(
    question: &'q Question,
    questions: &[&'q Question],
    proposed: &ProposedValues<'_>,
    marks: &mut HashMap<&'q str, Mark>,
) -> bool {
    match marks.get(question.id.as_str()) {
        Some(Mark::Done(visible)) => return *visible,
        Some(Mark::Visiting) => return true,
        None => {}
    }

    let Some(rule) = question.visibility_rule() else {
        marks.insert(question.id.as_str(), Mark::Done(true));
        return true;
    };

    let Some(target) = resolve_reference(questions, question, &rule.depends_on) else {
        warn!(
            question_id = %question.id,
            depends_on = %rule.depends_on,
            "visibility reference does not resolve; showing question"
        );
        marks.insert(question.id.as_str(), Mark::Done(true));
        return true;
    };

    marks.insert(question.id.as_str(), Mark::Visiting);
    let target_visible = evaluate(target, questions, proposed, marks);
    let visible = target_visible
        && proposed
            .get(target.id.as_str())
            .and_then(|value| value.as_text())
            .is_some_and(|text| rule.show_if_in.iter().any(|shown| shown == text));
    marks.insert(question.id.as_str(), Mark::Done(visible));
    visible
}

/// Follows visibility references from `start`; returns the loop it runs into.
fn walk_to_cycle<'q>(questions: &[&'q Question], start: &'q Question) -> Option<Vec<&'q Question>> {
    let mut path: Vec<&Question> = vec![start];
    let mut current = start;
    while let Some(rule) = current.visibility_rule() {
        let next = resolve_reference(questions, current, &rule.depends_on)?;
        if let Some(position) = path.iter().position(|q| q.id == next.id) {
            return Some(path.split_off(position));
        }
        path.push(next);
        current = next;
    }
    None
}

fn cycle_members<'q>(questions: &[&'q Question]) -> HashSet<&'q str> {
    questions
        .iter()
        .filter_map(|start| walk_to_cycle(questions, *start))
        .flatten()
        .map(|question| question.id.as_str())
        .collect()
}

/// Returns the ids along the first visibility cycle found, closing the loop.
pub fn find_cycle(questions: &[&Question]) -> Option<Vec<String>> {
    questions.iter().find_map(|start| {
        walk_to_cycle(questions, *start).map(|cycle| {
            let mut ids: Vec<String> = cycle.iter().map(|q| q.id.clone()).collect();
            ids.push(cycle[0].id.clone());
            ids
        })
    })
}

pub fn is_visible(map: &VisibilityMap, question_id: &str) -> bool {
    map.get(question_id).copied().unwrap_or(true)
}
