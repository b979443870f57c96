//! Resume screening workflow — runs every uploaded resume through
//! extraction, prompt building and the language model, one at a time.
//!
//! Per document: Uploaded → TextExtracted → PromptBuilt → ModelCalled →
//! {Succeeded | Failed}. A failure at any stage becomes that document's
//! result; the remaining documents are still screened.

use std::sync::Arc;

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::extraction::{ExtractionError, TextExtractor};
use crate::llm_client::{LanguageModel, ModelError};
use crate::screening::analysis::{parse_analysis, AnalysisSections};
use crate::screening::prompts::{build_screening_prompt, PromptError};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// An uploaded resume: display name plus the raw PDF payload.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub name: String,
    pub bytes: Bytes,
}

impl ResumeDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    InvalidInput(#[from] PromptError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Extraction,
    InvalidInput,
    Authentication,
    Transient,
    Unknown,
}

/// The input an `InvalidInput` failure is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidField {
    JobDescription,
    ResumeText,
}

/// Why a single resume could not be screened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreeningFailure {
    pub kind: FailureKind,
    /// Set only for `InvalidInput`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<InvalidField>,
    pub message: String,
}

impl From<&ScreeningError> for ScreeningFailure {
    fn from(e: &ScreeningError) -> Self {
        let kind = match e {
            ScreeningError::Extraction(_) => FailureKind::Extraction,
            ScreeningError::InvalidInput(_) => FailureKind::InvalidInput,
            ScreeningError::Model(ModelError::Authentication(_)) => FailureKind::Authentication,
            ScreeningError::Model(ModelError::Transient(_)) => FailureKind::Transient,
            ScreeningError::Model(ModelError::Unknown(_)) => FailureKind::Unknown,
        };
        let field = match e {
            ScreeningError::InvalidInput(PromptError::MissingJobDescription) => {
                Some(InvalidField::JobDescription)
            }
            ScreeningError::InvalidInput(PromptError::MissingResumeText) => {
                Some(InvalidField::ResumeText)
            }
            _ => None,
        };
        Self {
            kind,
            field,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScreeningOutcome {
    Succeeded {
        /// The model's response, unmodified.
        analysis: String,
        sections: AnalysisSections,
    },
    Failed {
        failure: ScreeningFailure,
    },
}

/// One result per uploaded resume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningResult {
    pub candidate: String,
    #[serde(flatten)]
    pub outcome: ScreeningOutcome,
}

impl ScreeningResult {
    fn succeeded(candidate: String, analysis: String) -> Self {
        let sections = parse_analysis(&analysis);
        Self {
            candidate,
            outcome: ScreeningOutcome::Succeeded { analysis, sections },
        }
    }

    fn failed(candidate: String, error: &ScreeningError) -> Self {
        Self {
            candidate,
            outcome: ScreeningOutcome::Failed {
                failure: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ScreeningOutcome::Succeeded { .. })
    }

    pub fn failure(&self) -> Option<&ScreeningFailure> {
        match &self.outcome {
            ScreeningOutcome::Failed { failure } => Some(failure),
            ScreeningOutcome::Succeeded { .. } => None,
        }
    }

    pub fn analysis(&self) -> Option<&str> {
        match &self.outcome {
            ScreeningOutcome::Succeeded { analysis, .. } => Some(analysis),
            ScreeningOutcome::Failed { .. } => None,
        }
    }

    /// Renders the candidate block shown to a reviewer.
    pub fn render_markdown(&self) -> String {
        let heading = format!("#### Candidate: {}", self.candidate);
        let body = match &self.outcome {
            ScreeningOutcome::Succeeded { analysis, .. } => analysis.trim().to_string(),
            ScreeningOutcome::Failed { failure } => match failure.kind {
                FailureKind::InvalidInput
                    if failure.field == Some(InvalidField::JobDescription) =>
                {
                    format!(
                        "> Could not screen {}: {}. Provide a job description and try again.",
                        self.candidate, failure.message
                    )
                }
                FailureKind::Extraction | FailureKind::InvalidInput => format!(
                    "> Failed to read the content of {}: {}",
                    self.candidate, failure.message
                ),
                FailureKind::Authentication => format!(
                    "> Could not analyze the resume for {}: {}\n>\n> Check that GOOGLE_API_KEY holds a valid Google AI API key.",
                    self.candidate, failure.message
                ),
                FailureKind::Transient | FailureKind::Unknown => format!(
                    "> Could not analyze the resume for {}: {}",
                    self.candidate, failure.message
                ),
            },
        };
        format!("{heading}\n\n{body}\n")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Workflow
// ────────────────────────────────────────────────────────────────────────────

/// Screens resumes strictly one after another.
#[derive(Clone)]
pub struct ScreeningWorkflow {
    extractor: Arc<dyn TextExtractor>,
    llm: Arc<dyn LanguageModel>,
}

impl ScreeningWorkflow {
    pub fn new(extractor: Arc<dyn TextExtractor>, llm: Arc<dyn LanguageModel>) -> Self {
        Self { extractor, llm }
    }

    /// Lazily screens `documents` in order, yielding one result per document.
    ///
    /// Nothing runs until the stream is polled; the stream owns the documents
    /// and ends after the last one.
    pub fn run_screening(
        &self,
        job_description: impl Into<String>,
        documents: Vec<ResumeDocument>,
    ) -> impl Stream<Item = ScreeningResult> + Send + 'static {
        let workflow = self.clone();
        let job_description: Arc<str> = Arc::from(job_description.into());

        stream::iter(documents).then(move |document| {
            let workflow = workflow.clone();
            let job_description = Arc::clone(&job_description);
            async move { workflow.screen_document(&job_description, document).await }
        })
    }

    /// Screens every document and collects the results in input order.
    pub async fn run_screening_to_end(
        &self,
        job_description: impl Into<String>,
        documents: Vec<ResumeDocument>,
    ) -> Vec<ScreeningResult> {
        self.run_screening(job_description, documents)
            .collect()
            .await
    }

    /// Screens a single document. Never fails: errors become the result.
    pub async fn screen_document(
        &self,
        job_description: &str,
        document: ResumeDocument,
    ) -> ScreeningResult {
        let span = info_span!("screen_resume", candidate = %document.name);
        let candidate = document.name.clone();

        async move {
            match self.try_screen(job_description, document).await {
                Ok(analysis) => {
                    info!("Resume screened");
                    ScreeningResult::succeeded(candidate, analysis)
                }
                Err(e) => {
                    warn!("Resume screening failed: {e}");
                    ScreeningResult::failed(candidate, &e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_screen(
        &self,
        job_description: &str,
        document: ResumeDocument,
    ) -> Result<String, ScreeningError> {
        debug!(bytes = document.bytes.len(), "uploaded");

        let text = self.extractor.extract(document.bytes).await?;
        debug!(chars = text.len(), "text extracted");

        let prompt = build_screening_prompt(job_description, &text)?;
        debug!(chars = prompt.len(), "prompt built");

        let analysis = self.llm.generate(&prompt).await?;
        debug!(chars = analysis.len(), "model called");

        Ok(analysis)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
