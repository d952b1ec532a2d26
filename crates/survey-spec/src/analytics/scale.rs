use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{percentage, round_to};
use crate::answers::AnswerValue;
use crate::spec::question::{Question, ScaleSpec};

/// Count for one integer point of the scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScaleBucket {
    pub value: i64,
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScaleStatistics {
    pub mean: f64,
    /// Lower-middle element when the count is even.
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub nps_score: f64,
    pub promoters: usize,
    pub detractors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScaleReport {
    pub distribution: Vec<ScaleBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ScaleStatistics>,
    pub total: usize,
}

pub(super) fn rating_scale(question: &Question, answers: &[&AnswerValue]) -> ScaleReport {
    let scale = question.scale_or_default();
    // Only whole points inside the scale count towards buckets and `total`.
    let values: Vec<f64> = answers
        .iter()
        .filter_map(|answer| answer.as_number())
        .filter(|value| value.is_finite() && value.fract() == 0.0 && scale.contains(*value))
        .collect();

    let distribution = (scale.min..=scale.max)
        .map(|point| {
            let count = values.iter().filter(|value| **value == point as f64).count();
            ScaleBucket {
                value: point,
                label: scale.label_for(point),
                count,
                percentage: percentage(count, values.len()),
            }
        })
        .collect();

    ScaleReport {
        distribution,
        statistics: statistics(&scale, &values),
        total: values.len(),
    }
}

fn statistics(scale: &ScaleSpec, values: &[f64]) -> Option<ScaleStatistics> {
    if values.is_empty() {
        return None;
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = sorted[(sorted.len() - 1) / 2];

    let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / count;

    let (promoters, detractors) = promoters_and_detractors(scale, values);
    let nps_score = (promoters as f64 - detractors as f64) / count * 100.0;

    Some(ScaleStatistics {
        mean: round_to(mean, 2),
        median: round_to(median, 2),
        std_dev: round_to(variance.sqrt(), 2),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        nps_score: round_to(nps_score, 1),
        promoters,
        detractors,
    })
}

/// Promoters sit within one point of the top, detractors within one point of
/// the bottom. On scales short enough for those bands to overlap, a value
/// belongs to the band on its side of the midpoint and the midpoint to neither.
fn promoters_and_detractors(scale: &ScaleSpec, values: &[f64]) -> (usize, usize) {
    let (min, max) = (scale.min as f64, scale.max as f64);
    let midpoint = (min + max) / 2.0;
    let promoters = values
        .iter()
        .filter(|value| **value >= max - 1.0 && **value > midpoint)
        .count();
    let detractors = values
        .iter()
        .filter(|value| **value <= min + 1.0 && **value < midpoint)
        .count();
    (promoters, detractors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::question::QuestionType;

    fn rating(min: i64, max: i64) -> Question {
        Question::new("r", "Rate us", QuestionType::Rating).with_scale(ScaleSpec::new(min, max))
    }

    fn report_for(question: &Question, raw: &[f64]) -> ScaleReport {
        let values: Vec<AnswerValue> = raw.iter().copied().map(AnswerValue::from).collect();
        let refs: Vec<&AnswerValue> = values.iter().collect();
        rating_scale(question, &refs)
    }

    #[test]
    fn distribution_and_statistics() {
        let report = report_for(&rating(1, 5), &[1.0, 1.0, 5.0, 5.0, 3.0]);
        let counts: Vec<(i64, usize)> = report
            .distribution
            .iter()
            .map(|bucket| (bucket.value, bucket.count))
            .collect();
        assert_eq!(counts, vec![(1, 2), (2, 0), (3, 1), (4, 0), (5, 2)]);

        let stats = report.statistics.expect("statistics");
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.std_dev, 1.79);
        assert_eq!((stats.promoters, stats.detractors), (2, 2));
        assert_eq!(stats.nps_score, 0.0);
    }

    #[test]
    fn median_takes_lower_middle_for_even_counts() {
        let report = report_for(&rating(1, 5), &[4.0, 1.0, 2.0, 5.0]);
        assert_eq!(report.statistics.expect("statistics").median, 2.0);
    }

    #[test]
    fn nps_extremes() {
        for (min, max) in [(1, 5), (0, 10), (1, 2), (1, 3)] {
            let question = rating(min, max);
            let top = report_for(&question, &[max as f64; 4]);
            assert_eq!(top.statistics.expect("stats").nps_score, 100.0);
            let bottom = report_for(&question, &[min as f64; 4]);
            assert_eq!(bottom.statistics.expect("stats").nps_score, -100.0);
        }
    }

    #[test]
    fn empty_answers_have_zeroed_rows_and_no_statistics() {
        let report = report_for(&rating(1, 3), &[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.distribution.len(), 3);
        assert!(report.distribution.iter().all(|b| b.count == 0 && b.percentage == 0.0));
        assert!(report.statistics.is_none());
    }

    #[test]
    fn non_numeric_answers_are_ignored() {
        let values = [AnswerValue::from("4"), AnswerValue::from(4.0)];
        let refs: Vec<&AnswerValue> = values.iter().collect();
        let report = rating_scale(&rating(1, 5), &refs);
        assert_eq!(report.total, 1);
        assert_eq!(report.distribution[3].percentage, 100.0);
    }

    #[test]
    fn off_scale_values_are_left_out_of_total() {
        let report = report_for(&rating(1, 5), &[2.5, 3.0, 9.0]);
        assert_eq!(report.total, 1);
        let counted: usize = report.distribution.iter().map(|b| b.count).sum();
        assert_eq!(counted, report.total);
        let share: f64 = report.distribution.iter().map(|b| b.percentage).sum();
        assert_eq!(share, 100.0);
        assert_eq!(report.statistics.expect("statistics").mean, 3.0);
    }

    #[test]
    fn labels_come_from_scale() {
        let question = Question::new("r", "Agree?", QuestionType::Scale).with_scale(ScaleSpec {
            min: 1,
            max: 3,
            labels: vec!["Disagree".into(), "Neutral".into(), "Agree".into()],
        });
        let report = report_for(&question, &[2.0]);
        let labels: Vec<&str> = report.distribution.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Disagree", "Neutral", "Agree"]);
    }
}
