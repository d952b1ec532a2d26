use serde_json::json;

use survey_spec::analytics::Report;
use survey_spec::{
    AnalysisLimits, AnswerStore, Form, FormSource, MemoryStore, NetworkContext, ResponseSummary,
    SubmissionPayload, accept_submission, analyze, analyze_form,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "feedback_form" => include_str!("../tests/fixtures/feedback_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn submit(store: &mut MemoryStore, answers: serde_json::Value) {
    let payload: SubmissionPayload =
        serde_json::from_value(json!({ "answers": answers })).expect("payload");
    let form = store.form("product-feedback").expect("form");
    let response =
        accept_submission(form, &payload, &NetworkContext::default()).expect("accepted");
    store.append(response);
}

fn seeded_store() -> MemoryStore {
    let form: Form = serde_json::from_str(fixture("feedback_form")).expect("form");
    let mut store = MemoryStore::with_form(form);
    let rows = [
        ("Robin", "dev", json!(["web", "friend"]), 1, "Setup was slow."),
        ("Sam", "dev", json!(["web"]), 1, "Slow docs, slow setup"),
        ("Kai", "design", json!(["none"]), 5, ""),
        ("Ana", "dev", json!(["friend", "web", "event"]), 5, "Lovely"),
        ("Lee", "design", json!(["web"]), 3, "   "),
    ];
    for (name, role, channels, rating, comment) in rows {
        submit(
            &mut store,
            json!([
                { "question_id": "q_name", "value": name },
                { "question_id": "q_role", "value": role },
                { "question_id": "q_channels", "value": channels },
                { "question_id": "q_rating", "value": rating },
                { "question_id": "q_comments", "value": comment }
            ]),
        );
    }
    store
}

fn report_for<'a>(analysis: &'a survey_spec::FormAnalysis, question_id: &str) -> &'a Report {
    &analysis
        .questions
        .iter()
        .find(|question| question.question_id == question_id)
        .expect("question analysed")
        .data
}

#[test]
fn single_choice_lists_every_option() {
    let store = seeded_store();
    let form = store.form("product-feedback").expect("form");
    let analysis = analyze_form(form, store.responses(), &AnalysisLimits::default());
    assert_eq!(analysis.total_responses, 5);

    let Report::SingleChoice(report) = report_for(&analysis, "q_role") else {
        panic!("expected single choice report");
    };
    let rows: Vec<(&str, &str, usize, f64)> = report
        .distribution
        .iter()
        .map(|row| (row.value.as_str(), row.label.as_str(), row.count, row.percentage))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("dev", "Developer", 3, 60.0),
            ("design", "Designer", 2, 40.0),
            ("pm", "Product manager", 0, 0.0),
            ("other", "Something else", 0, 0.0),
        ]
    );
    let sum: f64 = report.distribution.iter().map(|row| row.percentage).sum();
    assert!((sum - 100.0).abs() < 0.5);
}

#[test]
fn multi_choice_counts_selections_and_pairs() {
    let store = seeded_store();
    let form = store.form("product-feedback").expect("form");
    let analysis = analyze_form(form, store.responses(), &AnalysisLimits::default());

    let Report::MultiChoice(report) = report_for(&analysis, "q_channels") else {
        panic!("expected multi choice report");
    };
    assert_eq!(report.total_responses, 5);
    assert_eq!(report.total_selections, 8);
    assert_eq!(report.average_selections, 1.6);

    let counts: Vec<(&str, usize)> = report
        .distribution
        .iter()
        .map(|row| (row.value.as_str(), row.count))
        .collect();
    assert_eq!(
        counts,
        vec![("web", 4), ("friend", 2), ("none", 1), ("event", 1)]
    );

    let matrix: Vec<(&str, Vec<usize>)> = report
        .co_occurrence_matrix
        .iter()
        .map(|row| (row.option.as_str(), row.co_occurrences.clone()))
        .collect();
    assert_eq!(
        matrix,
        vec![
            ("web", vec![4, 2, 0, 1]),
            ("friend", vec![2, 2, 0, 1]),
            ("none", vec![0, 0, 1, 0]),
            ("event", vec![1, 1, 0, 1]),
        ]
    );
}

#[test]
fn rating_statistics_over_stored_answers() {
    let store = seeded_store();
    let form = store.form("product-feedback").expect("form");
    let analysis = analyze_form(form, store.responses(), &AnalysisLimits::default());

    let Report::Scale(report) = report_for(&analysis, "q_rating") else {
        panic!("expected scale report");
    };
    assert_eq!(report.total, 5);
    let labels: Vec<&str> = report
        .distribution
        .iter()
        .map(|bucket| bucket.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Poor", "Fair", "Good", "Very good", "Excellent"]);

    let stats = report.statistics.as_ref().expect("statistics");
    assert_eq!(stats.mean, 3.0);
    assert_eq!(stats.median, 3.0);
    assert_eq!(stats.std_dev, 1.79);
    assert_eq!((stats.promoters, stats.detractors), (2, 2));
    assert_eq!(stats.nps_score, 0.0);
}

#[test]
fn unanswered_scale_has_zeroed_distribution() {
    let store = seeded_store();
    let form = store.form("product-feedback").expect("form");
    let analysis = analyze_form(form, store.responses(), &AnalysisLimits::default());

    let Report::Scale(report) = report_for(&analysis, "q_recommend") else {
        panic!("expected scale report");
    };
    assert_eq!(report.total, 0);
    assert_eq!(report.distribution.len(), 11);
    assert!(report.distribution.iter().all(|bucket| bucket.count == 0));
    assert!(report.statistics.is_none());
}

#[test]
fn long_text_skips_blank_answers() {
    let store = seeded_store();
    let form = store.form("product-feedback").expect("form");
    let limits = AnalysisLimits {
        long_text_samples: 2,
        ..AnalysisLimits::default()
    };
    let analysis = analyze_form(form, store.responses(), &limits);

    let Report::Text(report) = report_for(&analysis, "q_comments") else {
        panic!("expected text report");
    };
    assert_eq!(report.total, 3);
    assert_eq!(report.frequency[0].word, "slow");
    assert_eq!(report.frequency[0].count, 3);
    assert_eq!(
        report.sample_responses.as_deref(),
        Some(&["Setup was slow.".to_string(), "Slow docs, slow setup".to_string()][..])
    );
}

#[test]
fn answers_from_store_feed_single_question_reports() {
    let store = seeded_store();
    let form = store.form("product-feedback").expect("form");
    let question = form.question("q_name").expect("question");
    let answers = store.answers_for("q_name");
    let report = analyze(question, answers.iter().map(|answer| &answer.value));
    assert_eq!(report.total(), 5);
}

#[test]
fn forms_without_responses_produce_empty_analysis() {
    let form: Form = serde_json::from_str(fixture("feedback_form")).expect("form");
    let analysis = analyze_form(&form, &[], &AnalysisLimits::default());
    assert_eq!(analysis.total_responses, 0);
    assert!(analysis.questions.is_empty());
}

#[test]
fn summaries_use_the_name_answer() {
    let store = seeded_store();
    let form = store.form("product-feedback").expect("form");
    let names: Vec<String> = store
        .responses_for("product-feedback")
        .into_iter()
        .map(|response| ResponseSummary::from_response(form, response).display_name)
        .collect();
    assert_eq!(names, vec!["Robin", "Sam", "Kai", "Ana", "Lee"]);
}
