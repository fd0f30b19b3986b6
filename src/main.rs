// ============================================================================
// File: src/main.rs
// Entry point and CLI handling
// ============================================================================

mod config;
mod error;
mod llm_client;
mod markdown;
mod models;
mod prompts;
mod session;
mod triage;

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::LlmError;
use crate::llm_client::LlmClient;
use crate::markdown::{MarkdownExporter, Report};
use crate::models::Message;
use crate::session::ChatSession;
use crate::triage::AppointmentRecommendation;

const DEFAULT_CONFIG_PATH: &str = "quanticure.json";

/// Command-line arguments for the clinical assistant
#[derive(Parser, Debug)]
#[command(name = "quanticure-assist")]
#[command(about = "Medical Q&A, appointment triage and lab analysis over OpenRouter", long_about = None)]
struct Args {
    /// Path to the JSON configuration file [default: quanticure.json, if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model identifier overriding the configured default
    #[arg(short, long)]
    model: Option<String>,

    /// Write the result as Markdown to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output (request details and debug logs)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the medical assistant a single question
    Ask {
        query: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Interactive conversation with the medical assistant
    Chat {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Get appointment urgency, specialist and preparation advice
    Triage {
        #[arg(long)]
        symptoms: String,

        #[arg(long)]
        history: String,

        /// Print the extracted fields as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze lab results, vital signs and medications
    Analyze {
        #[arg(long)]
        labs: String,

        #[arg(long)]
        vitals: String,

        #[arg(long)]
        meds: String,
    },
}

#[derive(ClapArgs, Debug)]
struct ContextArgs {
    /// Patient context, one fact per line
    #[arg(long, conflicts_with = "context_file")]
    context: Option<String>,

    /// Read patient context from a file
    #[arg(long)]
    context_file: Option<PathBuf>,
}

impl ContextArgs {
    fn resolve(&self) -> Result<Option<String>> {
        match (&self.context, &self.context_file) {
            (Some(text), _) => Ok(Some(text.clone())),
            (None, Some(path)) => fs::read_to_string(path)
                .map(|text| Some(text.trim_end().to_string()))
                .with_context(|| format!("Failed to read context file {}", path.display())),
            (None, None) => Ok(None),
        }
    }
}

/// How a command finished once its arguments and config were accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    /// The assistant call failed and the notice was already printed
    Failed,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    // Load configuration; only an explicitly named file has to exist
    let mut config = match &args.config {
        Some(path) => Config::load(path, true)?,
        None => Config::load(Path::new(DEFAULT_CONFIG_PATH), false)?,
    };
    if let Some(model) = &args.model {
        config.default_model = model.clone();
    }
    config.validate()?;

    let llm_client = LlmClient::new(&config);
    let outcome = dispatch(&args, llm_client).await?;

    Ok(outcome.into())
}

/// Run the selected command. One-shot commands report `Outcome::Failed` when
/// the assistant call fails; the interactive chat keeps going instead.
async fn dispatch(args: &Args, llm_client: LlmClient) -> Result<Outcome> {
    let model = llm_client.default_model().to_string();

    match &args.command {
        Command::Ask { query, context } => {
            let patient_context = context.resolve()?;
            let answer = with_spinner(
                "Consulting the medical assistant...",
                llm_client.get_medical_assistant_response(query, patient_context.as_deref(), &[]),
            )
            .await;
            let Some(answer) = report_failure(answer) else {
                return Ok(Outcome::Failed);
            };
            print_block("Assistant", &answer);

            if let Some(path) = &args.output {
                let history = [Message::user(query.as_str()), Message::assistant(answer)];
                let report = Report::Chat {
                    patient_context: patient_context.as_deref(),
                    history: &history,
                };
                export(&model, report, path)?;
            }
        }
        Command::Chat { context } => {
            let mut session = ChatSession::new(llm_client, context.resolve()?);
            run_chat(&mut session).await?;

            if let Some(path) = &args.output {
                let report = Report::Chat {
                    patient_context: session.patient_context(),
                    history: session.history(),
                };
                export(&model, report, path)?;
            }
        }
        Command::Triage {
            symptoms,
            history,
            json,
        } => {
            let advice = with_spinner(
                "Assessing appointment needs...",
                llm_client.get_appointment_recommendation(symptoms, history),
            )
            .await;
            let Some(advice) = report_failure(advice) else {
                return Ok(Outcome::Failed);
            };
            let recommendation = AppointmentRecommendation::from_response(&advice);

            if *json {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            } else {
                print_block("Advice", &advice);
                print_recommendation(&recommendation);
            }

            if let Some(path) = &args.output {
                let report = Report::Triage {
                    symptoms,
                    patient_history: history,
                    advice: &advice,
                    recommendation: &recommendation,
                };
                export(&model, report, path)?;
            }
        }
        Command::Analyze { labs, vitals, meds } => {
            let analysis = with_spinner(
                "Analyzing medical data...",
                llm_client.analyze_medical_data(labs, vitals, meds),
            )
            .await;
            let Some(analysis) = report_failure(analysis) else {
                return Ok(Outcome::Failed);
            };
            print_block("Analysis", &analysis);

            if let Some(path) = &args.output {
                let report = Report::Analysis {
                    lab_results: labs,
                    vital_signs: vitals,
                    medications: meds,
                    analysis: &analysis,
                };
                export(&model, report, path)?;
            }
        }
    }

    Ok(Outcome::Completed)
}

/// Filter used when `RUST_LOG` is unset. Failures are already reported on
/// stderr by the command itself, so only `error` records pass by default.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "error"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run_chat(session: &mut ChatSession) -> Result<()> {
    println!("{}", "\n═══════════════════════════════════════".bright_blue());
    println!("{}", "     QUANTICURE MEDICAL ASSISTANT".bright_white().bold());
    println!("{}", "═══════════════════════════════════════".bright_blue());
    println!(
        "{}: {}   {}",
        "Model".green().bold(),
        session.model(),
        "(/reset clears history, /quit exits)".bright_black()
    );

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(format!("\n{} ", "you ›".cyan().bold()).as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();

        match query {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                println!("{} Conversation cleared", "✓".green());
                continue;
            }
            _ => {}
        }

        let answer = with_spinner("Thinking...", session.ask(query)).await;
        if let Some(answer) = report_failure(answer) {
            print_block("Assistant", &answer);
        }
    }

    Ok(())
}

/// Drive `future` while a spinner runs on stderr
async fn with_spinner<T>(message: &'static str, future: impl Future<Output = T>) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output = future.await;
    spinner.finish_and_clear();
    output
}

/// Print a failed call the way the UI did: a generic notice plus the reason
fn report_failure(result: Result<String, LlmError>) -> Option<String> {
    match result {
        Ok(text) => Some(text),
        Err(err) => {
            eprintln!(
                "{} Failed to get recommendation: {}",
                "✗".red().bold(),
                err.to_string().bright_black()
            );
            if err.is_retryable() {
                eprintln!("  {}", "The provider may be temporarily unavailable; try again shortly.".yellow());
            }
            None
        }
    }
}

fn print_block(title: &str, body: &str) {
    println!("\n{} {}", "●".bright_cyan(), title.bright_white().bold());
    println!("{}", "─".repeat(40).bright_black());
    println!("{}", body.trim_end());
}

fn print_recommendation(recommendation: &AppointmentRecommendation) {
    if recommendation.is_empty() {
        println!(
            "\n{} No labelled fields found in the advice",
            "⚠".yellow()
        );
        return;
    }

    println!("\n{} {}", "●".bright_cyan(), "Recommendation".bright_white().bold());
    println!("{}", "─".repeat(40).bright_black());
    for (label, value) in recommendation.fields() {
        let value = if value.is_empty() { "-" } else { value };
        println!("{:>15}: {}", label.green().bold(), value);
    }
}

fn export(model: &str, report: Report<'_>, path: &Path) -> Result<()> {
    MarkdownExporter::new(model, report).export(path)?;
    println!(
        "\n{} Exported to: {}",
        "✓".green().bold(),
        path.display().to_string().bright_cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::llm_client::fake::{completion_body, test_config, FakeTransport};

    fn client_with(transport: Arc<FakeTransport>) -> LlmClient {
        LlmClient::with_transport(&test_config("https://example.test"), transport)
    }

    #[tokio::test]
    async fn failed_triage_reports_failure_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("triage.md");
        let args = Args::try_parse_from([
            "quanticure-assist",
            "--output",
            output.to_str().unwrap(),
            "triage",
            "--symptoms",
            "a",
            "--history",
            "b",
            "--json",
        ])
        .unwrap();
        let transport = Arc::new(FakeTransport::default());
        transport.push_failure("connection refused");

        let outcome = dispatch(&args, client_with(transport)).await.unwrap();

        assert_eq!(outcome, Outcome::Failed);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn failed_ask_and_analyze_report_failure() {
        let ask = Args::try_parse_from(["quanticure-assist", "ask", "hello"]).unwrap();
        let transport = FakeTransport::replying(500, serde_json::json!({ "message": "overloaded" }));
        assert_eq!(dispatch(&ask, client_with(transport)).await.unwrap(), Outcome::Failed);

        let analyze = Args::try_parse_from([
            "quanticure-assist",
            "analyze",
            "--labs",
            "LDL 190",
            "--vitals",
            "BP 140/90",
            "--meds",
            "none",
        ])
        .unwrap();
        let transport = FakeTransport::replying(401, serde_json::json!({}));
        assert_eq!(dispatch(&analyze, client_with(transport)).await.unwrap(), Outcome::Failed);
    }

    #[tokio::test]
    async fn successful_triage_completes_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("triage.md");
        let args = Args::try_parse_from([
            "quanticure-assist",
            "--output",
            output.to_str().unwrap(),
            "triage",
            "--symptoms",
            "joint pain",
            "--history",
            "RA",
        ])
        .unwrap();
        let transport = FakeTransport::replying(200, completion_body("Urgency: High"));

        let outcome = dispatch(&args, client_with(transport)).await.unwrap();

        assert_eq!(outcome, Outcome::Completed);
        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("| Urgency | High |"));
    }

    #[test]
    fn default_filter_keeps_only_errors_unless_verbose() {
        assert_eq!(default_log_filter(false), "error");
        assert_eq!(default_log_filter(true), "debug");
    }
}
