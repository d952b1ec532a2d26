pub mod form;
pub mod question;

pub use form::{Form, FormStatus, Section};
pub use question::{ChoiceOption, Question, QuestionType, ScaleSpec, VisibilityRule};
