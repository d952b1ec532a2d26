use std::collections::HashMap;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::answers::AnswerValue;

const WORD_PATTERN: &str = r"\w+";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Token frequencies for free-text questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextReport {
    /// Non-blank answers.
    pub total: usize,
    pub frequency: Vec<WordCount>,
    pub word_cloud: Vec<WordCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_responses: Option<Vec<String>>,
}

fn word_regex() -> Option<Regex> {
    match Regex::new(WORD_PATTERN) {
        Ok(regex) => Some(regex),
        Err(error) => {
            warn!(pattern = WORD_PATTERN, %error, "word pattern failed to compile");
            None
        }
    }
}

fn tokens(words: &Regex, text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    words
        .find_iter(&lowered)
        .map(|word| word.as_str().to_string())
        .collect()
}

/// Lowercased word tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    word_regex()
        .map(|words| tokens(&words, text))
        .unwrap_or_default()
}

fn non_blank<'a>(answers: &[&'a AnswerValue]) -> Vec<&'a str> {
    answers
        .iter()
        .copied()
        .filter_map(AnswerValue::as_text)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Most frequent tokens first; equal counts keep first-seen order.
fn frequency(texts: &[&str], top: usize) -> Vec<WordCount> {
    let Some(words) = word_regex() else {
        return Vec::new();
    };
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<WordCount> = Vec::new();
    for word in texts.iter().flat_map(|text| tokens(&words, text)) {
        match index.get(&word) {
            Some(slot) => counts[*slot].count += 1,
            None => {
                index.insert(word.clone(), counts.len());
                counts.push(WordCount { word, count: 1 });
            }
        }
    }
    counts.sort_by(|left, right| right.count.cmp(&left.count));
    counts.truncate(top);
    counts
}

pub(super) fn short_text(answers: &[&AnswerValue], top: usize, cloud: usize) -> TextReport {
    let texts = non_blank(answers);
    let frequency = frequency(&texts, top);
    TextReport {
        total: texts.len(),
        word_cloud: frequency.iter().take(cloud).cloned().collect(),
        frequency,
        sample_responses: None,
    }
}

pub(super) fn long_text(
    answers: &[&AnswerValue],
    top: usize,
    cloud: usize,
    samples: usize,
) -> TextReport {
    let texts = non_blank(answers);
    let frequency = frequency(&texts, top);
    TextReport {
        total: texts.len(),
        word_cloud: frequency.iter().take(cloud).cloned().collect(),
        frequency,
        sample_responses: Some(
            texts
                .iter()
                .take(samples)
                .map(|text| text.to_string())
                .collect(),
        ),
    }
}
