use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{percentage, round_to};
use crate::answers::AnswerValue;
use crate::spec::question::Question;

/// One option's share of the answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DistributionRow {
    pub value: String,
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceReport {
    pub distribution: Vec<DistributionRow>,
    pub total: usize,
}

/// Row of the co-occurrence matrix; `co_occurrences[j]` lines up with row `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoOccurrenceRow {
    pub option: String,
    pub label: String,
    pub co_occurrences: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MultiChoiceReport {
    pub distribution: Vec<DistributionRow>,
    pub total_responses: usize,
    pub total_selections: usize,
    pub average_selections: f64,
    pub co_occurrence_matrix: Vec<CoOccurrenceRow>,
}

/// Counts values in the order they were first seen.
#[derive(Default)]
struct Tally {
    order: Vec<String>,
    index: HashMap<String, usize>,
    counts: Vec<usize>,
}

impl Tally {
    fn add(&mut self, value: &str) -> usize {
        let slot = match self.index.get(value) {
            Some(slot) => *slot,
            None => {
                let slot = self.order.len();
                self.order.push(value.to_string());
                self.index.insert(value.to_string(), slot);
                self.counts.push(0);
                slot
            }
        };
        self.counts[slot] += 1;
        slot
    }

    /// Observed values by count (descending, ties in first-seen order), then
    /// declared options nobody picked, in declaration order.
    fn distribution(&self, question: &Question, total: usize) -> Vec<DistributionRow> {
        let mut observed: Vec<(&str, usize)> = self
            .order
            .iter()
            .map(String::as_str)
            .zip(self.counts.iter().copied())
            .collect();
        observed.sort_by(|left, right| right.1.cmp(&left.1));

        let unpicked = question
            .options
            .iter()
            .filter(|option| !self.index.contains_key(&option.value))
            .map(|option| (option.value.as_str(), 0));

        observed
            .into_iter()
            .chain(unpicked)
            .map(|(value, count)| DistributionRow {
                value: value.to_string(),
                label: label_for(question, value),
                count,
                percentage: percentage(count, total),
            })
            .collect()
    }
}

fn label_for(question: &Question, value: &str) -> String {
    question.option_label(value).unwrap_or(value).to_string()
}

pub(super) fn single_choice(question: &Question, answers: &[&AnswerValue]) -> ChoiceReport {
    let mut tally = Tally::default();
    for choice in answers.iter().filter_map(|answer| answer.as_text()) {
        tally.add(choice);
    }

    ChoiceReport {
        distribution: tally.distribution(question, answers.len()),
        total: answers.len(),
    }
}

pub(super) fn multi_choice(question: &Question, answers: &[&AnswerValue]) -> MultiChoiceReport {
    let total = answers.len();
    let mut tally = Tally::default();
    let mut pairs: HashMap<(usize, usize), usize> = HashMap::new();
    let mut total_selections = 0;

    for choices in answers.iter().filter_map(|answer| answer.as_choices()) {
        let mut slots: Vec<usize> = Vec::with_capacity(choices.len());
        for choice in choices {
            let repeated = tally
                .index
                .get(choice.as_str())
                .is_some_and(|slot| slots.contains(slot));
            if !repeated {
                slots.push(tally.add(choice));
            }
        }
        total_selections += slots.len();

        for (position, first) in slots.iter().enumerate() {
            for second in &slots[position + 1..] {
                *pairs.entry((*first, *second)).or_default() += 1;
                *pairs.entry((*second, *first)).or_default() += 1;
            }
        }
    }

    let co_occurrence_matrix = tally
        .order
        .iter()
        .enumerate()
        .map(|(row, value)| CoOccurrenceRow {
            option: value.clone(),
            label: label_for(question, value),
            co_occurrences: (0..tally.order.len())
                .map(|column| {
                    if row == column {
                        tally.counts[row]
                    } else {
                        pairs.get(&(row, column)).copied().unwrap_or(0)
                    }
                })
                .collect(),
        })
        .collect();

    let average_selections = if total == 0 {
        0.0
    } else {
        round_to(total_selections as f64 / total as f64, 2)
    };

    MultiChoiceReport {
        distribution: tally.distribution(question, total),
        total_responses: total,
        total_selections,
        average_selections,
        co_occurrence_matrix,
    }
}
