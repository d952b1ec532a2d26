use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use survey_component::{analyze as component_analyze, analyze_question};
use survey_spec::{
    Form, NetworkContext, ProposedAnswer, SubmissionPayload, accept_submission, form_schema,
};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "SURVEY_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Survey form CLI",
    long_about = "Checks form definitions, validates submissions and analyses stored responses"
)]
struct Cli {
    /// Log at debug level regardless of SURVEY_LOG.
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a form definition for authoring errors.
    Check {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM", required_unless_present = "print_schema")]
        form: Option<PathBuf>,
        /// Print the JSON Schema of the form document instead.
        #[arg(long)]
        print_schema: bool,
    },
    /// Validate a submission and print the accepted response.
    Submit {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Submission payload, or a bare list of answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Raw forwarded-for header value.
        #[arg(long, value_name = "VALUE")]
        forwarded_for: Option<String>,
        /// Direct peer address.
        #[arg(long, value_name = "ADDR")]
        peer: Option<String>,
        /// External user id, overriding the one in the payload.
        #[arg(long, value_name = "ID")]
        user_id: Option<String>,
    },
    /// Analyse stored responses of a form.
    Analyze {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// JSON list of accepted responses.
        #[arg(long, value_name = "RESPONSES")]
        responses: PathBuf,
        /// Only report on this question.
        #[arg(long, value_name = "ID")]
        question: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnswersFile {
    Payload(SubmissionPayload),
    Answers(Vec<ProposedAnswer>),
}

impl AnswersFile {
    fn into_payload(self) -> SubmissionPayload {
        match self {
            AnswersFile::Payload(payload) => payload,
            AnswersFile::Answers(answers) => SubmissionPayload::new(answers),
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Check { form, print_schema } => run_check(form, print_schema),
        Command::Submit {
            form,
            answers,
            forwarded_for,
            peer,
            user_id,
        } => run_submit(
            form,
            answers,
            NetworkContext {
                forwarded_for,
                peer_addr: peer,
            },
            user_id,
        ),
        Command::Analyze {
            form,
            responses,
            question,
        } => run_analyze(form, responses, question),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn read_form(path: &Path) -> CliResult<Form> {
    let form_json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&form_json)?)
}

fn print_json(value: &impl serde::Serialize) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_check(form_path: Option<PathBuf>, print_schema: bool) -> CliResult<()> {
    if print_schema {
        return print_json(&form_schema());
    }

    let form_path = form_path.ok_or("--form is required")?;
    let form = read_form(&form_path)?;
    if let Err(rejection) = form.check_definition() {
        println!("Form '{}' is invalid", form.id);
        print_json(&rejection.to_report())?;
        return Err(rejection.to_string().into());
    }

    println!(
        "Form '{}' is valid: {} sections, {} questions ({})",
        form.id,
        form.sections.len(),
        form.questions().count(),
        if form.is_published() {
            "published"
        } else {
            "draft"
        }
    );
    Ok(())
}

fn run_submit(
    form_path: PathBuf,
    answers_path: PathBuf,
    network: NetworkContext,
    user_id: Option<String>,
) -> CliResult<()> {
    let form = read_form(&form_path)?;
    let answers_json = fs::read_to_string(answers_path)?;
    let mut payload = serde_json::from_str::<AnswersFile>(&answers_json)?.into_payload();
    if user_id.is_some() {
        payload.user_id = user_id;
    }
    debug!(form_id = %form.id, answers = payload.answers.len(), "submitting");

    match accept_submission(&form, &payload, &network) {
        Ok(response) => {
            println!("{}", response.to_json_pretty()?);
            Ok(())
        }
        Err(rejection) => {
            print_json(&rejection.to_report())?;
            Err(rejection.to_string().into())
        }
    }
}

fn run_analyze(
    form_path: PathBuf,
    responses_path: PathBuf,
    question: Option<String>,
) -> CliResult<()> {
    let form_json = fs::read_to_string(&form_path)?;
    let form: Form = serde_json::from_str(&form_json)?;
    let responses_json = fs::read_to_string(responses_path)?;
    let config = json!({ "form_json": form_json }).to_string();

    let output = match question {
        Some(question_id) => analyze_question(&question_id, &config, &responses_json),
        None => component_analyze(&form.id, &config, &responses_json),
    };
    let envelope: Value = serde_json::from_str(&output)?;
    if let Some(error) = envelope.get("error") {
        print_json(error)?;
        let reason = error
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("analysis failed");
        return Err(reason.into());
    }
    print_json(&envelope["data"])
}
