//! Resume screening service: extracts text from PDF resumes and asks a
//! generative model to score each one against a job description.

pub mod config;
pub mod errors;
pub mod extraction;
pub mod llm_client;
pub mod routes;
pub mod screening;
pub mod state;
