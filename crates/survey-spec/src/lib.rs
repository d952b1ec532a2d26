#![allow(missing_docs)]

pub mod analytics;
pub mod answers;
pub mod error;
pub mod reconcile;
pub mod spec;
pub mod store;
pub mod submission;
pub mod summary;
pub mod validate;
pub mod visibility;

pub use analytics::{
    AnalysisLimits, FormAnalysis, QuestionAnalysis, Report, analyze, analyze_form,
    analyze_with_limits,
};
pub use answers::{
    AcceptedResponse, Answer, AnswerValue, NetworkContext, ProposedAnswer, SubmissionPayload,
};
pub use error::{Rejection, RejectionKind, RejectionReport};
pub use reconcile::{ChangeSet, FormUpdate, SectionUpdate, apply_form_update, apply_questions};
pub use spec::{
    ChoiceOption, Form, FormStatus, Question, QuestionType, ScaleSpec, Section, VisibilityRule,
};
pub use store::{AnswerStore, FormSource, MemoryStore, StoreError};
pub use submission::{accept_submission, check_submission};
pub use summary::{ResponseDetail, ResponseSummary};
pub use validate::validate_answer;
pub use visibility::{VisibilityMap, resolve_reference, visible_questions};

/// JSON Schema of the form document.
pub fn form_schema() -> schemars::Schema {
    schemars::schema_for!(Form)
}
