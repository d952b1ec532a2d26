use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use survey_spec::{
    AcceptedResponse, AnalysisLimits, AnswerStore, Form, MemoryStore, NetworkContext,
    QuestionAnalysis, Rejection, ResponseDetail, ResponseSummary, StoreError, SubmissionPayload,
    accept_submission, analyze_form, analyze_with_limits,
};

const DEFAULT_FORM: &str = include_str!("../../survey-spec/tests/fixtures/feedback_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse {0}: {1}")]
    Parse(&'static str, #[source] serde_json::Error),
    #[error("configured form is invalid: {0}")]
    Definition(#[source] Rejection),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ComponentError {
    fn status(&self) -> u16 {
        match self {
            ComponentError::Parse(..) => 400,
            ComponentError::Rejected(Rejection::FormNotFound(_)) => 404,
            ComponentError::Rejected(_) => 400,
            ComponentError::Store(_) => 404,
            ComponentError::Definition(_) | ComponentError::JsonEncode(_) => 500,
        }
    }

    fn body(&self) -> Value {
        match self {
            ComponentError::Rejected(rejection) => {
                serde_json::to_value(rejection.to_report()).unwrap_or_else(|_| {
                    json!({ "kind": format!("{:?}", rejection.kind()), "reason": self.to_string() })
                })
            }
            ComponentError::Store(StoreError::FormNotFound(_)) => {
                json!({ "kind": "FormNotFound", "reason": self.to_string() })
            }
            ComponentError::Store(StoreError::QuestionNotFound(_)) => {
                json!({ "kind": "QuestionNotFound", "reason": self.to_string() })
            }
            ComponentError::Store(StoreError::ResponseNotFound(_)) => {
                json!({ "kind": "ResponseNotFound", "reason": self.to_string() })
            }
            ComponentError::Parse(..) => json!({ "kind": "InvalidRequest", "reason": self.to_string() }),
            ComponentError::Definition(_) | ComponentError::JsonEncode(_) => {
                json!({ "kind": "Internal", "reason": self.to_string() })
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_json: Option<String>,
    #[serde(default)]
    limits: Option<AnalysisLimits>,
}

fn parse_or_default<T>(label: &'static str, raw: &str) -> Result<T, ComponentError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if raw.trim().is_empty() {
        Ok(T::default())
    } else {
        serde_json::from_str(raw).map_err(|err| ComponentError::Parse(label, err))
    }
}

fn load_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    parse_or_default("config", config_json)
}

fn load_form(config: &ComponentConfig) -> Result<Form, ComponentError> {
    let form_json = config.form_json.as_deref().unwrap_or(DEFAULT_FORM);
    let form: Form =
        serde_json::from_str(form_json).map_err(|err| ComponentError::Parse("form", err))?;
    form.check_definition().map_err(|rejection| {
        if rejection.kind().is_definition_error() {
            ComponentError::Definition(rejection)
        } else {
            ComponentError::Rejected(rejection)
        }
    })?;
    Ok(form)
}

fn load_store(config: &ComponentConfig, responses_json: &str) -> Result<MemoryStore, ComponentError> {
    let mut store = MemoryStore::with_form(load_form(config)?);
    let responses: Vec<AcceptedResponse> = parse_or_default("responses", responses_json)?;
    for response in responses {
        store.append(response);
    }
    Ok(store)
}

fn limits(config: &ComponentConfig) -> AnalysisLimits {
    config.limits.unwrap_or_default()
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

fn respond_with(status: u16, result: Result<Value, ComponentError>) -> String {
    let envelope = match result {
        Ok(data) => json!({ "status": status, "data": data }),
        Err(err) => {
            if err.status() >= 500 {
                warn!(error = %err, "component call failed");
            } else {
                debug!(status = err.status(), error = %err, "component call refused");
            }
            json!({ "status": err.status(), "error": err.body() })
        }
    };
    serde_json::to_string(&envelope).unwrap_or_else(|error| {
        json!({
            "status": 500,
            "error": { "kind": "Internal", "reason": format!("json encode: {}", error) }
        })
        .to_string()
    })
}

fn respond(result: Result<Value, ComponentError>) -> String {
    respond_with(200, result)
}

/// Returns the form definition for `form_ref` (id, or uuid of a published form).
pub fn describe(form_ref: &str, config_json: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let store = load_store(&config, "")?;
        encode(store.resolve(form_ref)?)
    }))
}

/// Validates a submission and returns the accepted response.
pub fn submit(form_ref: &str, config_json: &str, payload_json: &str, network_json: &str) -> String {
    let result = load_config(config_json).and_then(|config| {
        let store = load_store(&config, "")?;
        let form = store
            .resolve(form_ref)
            .map_err(|_| Rejection::FormNotFound(form_ref.to_string()))?;
        let payload: SubmissionPayload = parse_or_default("payload", payload_json)?;
        let network: NetworkContext = parse_or_default("network", network_json)?;
        let response = accept_submission(form, &payload, &network)?;
        encode(&response)
    });
    respond_with(201, result)
}

/// Whole-form analysis over the stored responses in `responses_json`.
pub fn analyze(form_ref: &str, config_json: &str, responses_json: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let store = load_store(&config, responses_json)?;
        let form = store.resolve(form_ref)?;
        encode(&analyze_form(form, store.responses(), &limits(&config)))
    }))
}

/// Report for a single question.
pub fn analyze_question(question_ref: &str, config_json: &str, responses_json: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let store = load_store(&config, responses_json)?;
        let form = store.form_for_question(question_ref)?;
        let question = form
            .question(question_ref)
            .ok_or_else(|| StoreError::QuestionNotFound(question_ref.to_string()))?;
        let answers = store.answers_for(question_ref);
        let analysis = QuestionAnalysis {
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            question_type: question.kind,
            total_answers: answers.len(),
            data: analyze_with_limits(
                question,
                answers.iter().map(|answer| &answer.value),
                &limits(&config),
            ),
        };
        encode(&analysis)
    }))
}

/// Listing entries for the stored responses of a form.
pub fn summarize(form_ref: &str, config_json: &str, responses_json: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let store = load_store(&config, responses_json)?;
        let form = store.resolve(form_ref)?;
        let summaries: Vec<ResponseSummary> = store
            .responses_for(&form.id)
            .into_iter()
            .map(|response| ResponseSummary::from_response(form, response))
            .collect();
        encode(&summaries)
    }))
}

/// One stored response with every answer joined to its question.
pub fn response_detail(
    form_ref: &str,
    config_json: &str,
    responses_json: &str,
    response_id: &str,
) -> String {
    respond(load_config(config_json).and_then(|config| {
        let store = load_store(&config, responses_json)?;
        let form = store.resolve(form_ref)?;
        let response = store
            .response(response_id)
            .ok()
            .filter(|response| response.form_id == form.id)
            .ok_or_else(|| StoreError::ResponseNotFound(response_id.to_string()))?;
        encode(&ResponseDetail::from_response(form, response))
    }))
}
