// Resume screening: prompt template, model output parsing, the per-document
// workflow and its HTTP handler. Model calls go through llm_client only.

pub mod analysis;
pub mod handlers;
pub mod prompts;
pub mod workflow;

pub use workflow::{
    FailureKind, InvalidField, ResumeDocument, ScreeningFailure, ScreeningOutcome, ScreeningResult,
    ScreeningWorkflow,
};
