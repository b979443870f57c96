//! Command-line front end: screens local PDF resumes against a job
//! description and prints one block per candidate as results arrive.

use std::path::{Path, PathBuf};
use std::pin::pin;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use screener::config::Config;
use screener::extraction::PdfTextExtractor;
use screener::llm_client::GeminiClient;
use screener::screening::{ResumeDocument, ScreeningResult, ScreeningWorkflow};

#[derive(Debug, Parser)]
#[command(name = "screen", version, about = "Screen PDF resumes against a job description")]
struct Cli {
    /// File containing the job description
    #[arg(long, conflicts_with = "jd_text", required_unless_present = "jd_text")]
    jd: Option<PathBuf>,

    /// Job description given inline
    #[arg(long)]
    jd_text: Option<String>,

    /// Print one JSON object per candidate instead of markdown
    #[arg(long)]
    json: bool,

    /// PDF resumes, screened in the order given
    #[arg(required = true)]
    resumes: Vec<PathBuf>,
}

/// Every candidate was screened.
const EXIT_ALL_SCREENED: u8 = 0;
/// Usage, configuration or I/O error before screening finished.
const EXIT_ERROR: u8 = 1;
/// At least one candidate could not be screened.
const EXIT_CANDIDATE_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_status(&e));
        }
    };

    let outcome = run(cli).await;
    if let Err(e) = &outcome {
        eprintln!("error: {e:#}");
    }
    ExitCode::from(exit_status(&outcome))
}

/// `--help` and `--version` are not errors; anything else clap rejects is.
fn usage_exit_status(e: &clap::Error) -> u8 {
    if e.use_stderr() {
        EXIT_ERROR
    } else {
        EXIT_ALL_SCREENED
    }
}

fn exit_status(outcome: &Result<bool>) -> u8 {
    match outcome {
        Ok(true) => EXIT_ALL_SCREENED,
        Ok(false) => EXIT_CANDIDATE_FAILED,
        Err(_) => EXIT_ERROR,
    }
}

/// Returns whether every candidate was screened successfully.
async fn run(cli: Cli) -> Result<bool> {
    let config = Config::from_env()?;

    // Logs go to stderr so stdout stays clean for the report.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let job_description = match (&cli.jd, cli.jd_text) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job description from {}", path.display()))?,
        (None, Some(text)) => text,
        (None, None) => bail!("provide --jd or --jd-text"),
    };
    if job_description.trim().is_empty() {
        bail!("the job description is empty");
    }
    if !config.has_api_key() {
        warn!("GOOGLE_API_KEY is not set; model calls will fail");
    }

    let documents = cli
        .resumes
        .iter()
        .map(|path| load_document(path))
        .collect::<Result<Vec<_>>>()?;

    let llm = GeminiClient::new(config.google_api_key.clone(), &config.gemini_api_base)?;
    let workflow = ScreeningWorkflow::new(Arc::new(PdfTextExtractor), Arc::new(llm));

    let mut all_succeeded = true;
    let mut results = pin!(workflow.run_screening(job_description, documents));
    while let Some(result) = results.next().await {
        all_succeeded &= result.is_success();
        print_result(&result, cli.json)?;
    }

    Ok(all_succeeded)
}

fn load_document(path: &Path) -> Result<ResumeDocument> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ResumeDocument::new(name, bytes))
}

fn print_result(result: &ScreeningResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(result)?);
    } else {
        println!("{}", result.render_markdown());
        println!("---");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_jd_file_and_resumes_parse() {
        let cli = Cli::try_parse_from(["screen", "--jd", "jd.txt", "a.pdf", "b.pdf"]).unwrap();
        assert_eq!(cli.jd, Some(PathBuf::from("jd.txt")));
        assert_eq!(cli.resumes, [PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);
        assert!(!cli.json);
    }

    #[test]
    fn test_inline_jd_is_accepted() {
        let cli = Cli::try_parse_from(["screen", "--jd-text", "Rust engineer", "--json", "a.pdf"])
            .unwrap();
        assert_eq!(cli.jd_text.as_deref(), Some("Rust engineer"));
        assert!(cli.json);
    }

    #[test]
    fn test_jd_and_jd_text_conflict() {
        let err = Cli::try_parse_from(["screen", "--jd", "jd.txt", "--jd-text", "x", "a.pdf"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        assert_eq!(usage_exit_status(&err), EXIT_ERROR);
    }

    #[test]
    fn test_job_description_is_required() {
        let err = Cli::try_parse_from(["screen", "a.pdf"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert_eq!(usage_exit_status(&err), EXIT_ERROR);
    }

    #[test]
    fn test_at_least_one_resume_is_required() {
        let err = Cli::try_parse_from(["screen", "--jd", "jd.txt"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_help_exits_cleanly() {
        let err = Cli::try_parse_from(["screen", "--help"]).unwrap_err();
        assert_eq!(usage_exit_status(&err), EXIT_ALL_SCREENED);
    }

    #[test]
    fn test_exit_status_mapping() {
        assert_eq!(exit_status(&Ok(true)), 0);
        assert_eq!(exit_status(&Ok(false)), 2);
        assert_eq!(exit_status(&Err(anyhow::anyhow!("missing file"))), 1);
    }
}
