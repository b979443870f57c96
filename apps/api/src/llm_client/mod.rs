/// LLM Client — the single point of entry for all Gemini API calls.
///
/// No other module may call the Generative Language API directly; the
/// screening workflow depends only on the `LanguageModel` trait.
///
/// Model: gemini-1.5-flash (hardcoded, not configurable)
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// The model used for every screening call.
pub const MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const API_KEY_HEADER: &str = "x-goog-api-key";
const INVALID_KEY_MARKER: &str = "API_KEY_INVALID";

/// Why a model call failed. Classification is heuristic: the upstream API
/// reports errors as free text plus an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("model service unavailable: {0}")]
    Transient(String),

    #[error("model call failed: {0}")]
    Unknown(String),
}

/// A generative text backend: one prompt in, one block of text out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Joins the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn empty_reason(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return format!("prompt blocked by the model ({reason})");
        }
        match self.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            Some(reason) => format!("model returned no text (finish reason {reason})"),
            None => "model returned no text".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

/// Gemini `generateContent` client. The API key is fixed at construction.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, api_base: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: format!(
                "{}/v1beta/models/{MODEL}:generateContent",
                api_base.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        if self.api_key.trim().is_empty() {
            return Err(ModelError::Authentication(
                "no Google API key is configured".to_string(),
            ));
        }

        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            return Err(classify_status(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Unknown(format!("unreadable model response: {e}")))?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={:?}, output_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        parsed
            .text()
            .ok_or_else(|| ModelError::Unknown(parsed.empty_reason()))
    }
}

fn classify_transport_error(e: reqwest::Error) -> ModelError {
    if e.is_builder() {
        ModelError::Unknown(e.to_string())
    } else {
        ModelError::Transient(e.to_string())
    }
}

/// Maps a non-success HTTP status and body onto a `ModelError`.
fn classify_status(status: u16, body: &str) -> ModelError {
    let message = serde_json::from_str::<GoogleError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    if matches!(status, 401 | 403) || body.contains(INVALID_KEY_MARKER) {
        ModelError::Authentication(message)
    } else if status == 429 || (500..600).contains(&status) {
        ModelError::Transient(format!("status {status}: {message}"))
    } else {
        ModelError::Unknown(format!("status {status}: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    const INVALID_KEY_BODY: &str = r#"{
        "error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT",
            "details": [{"reason": "API_KEY_INVALID", "domain": "googleapis.com"}]
        }
    }"#;

    /// Serves a canned Gemini response on an ephemeral port and returns its base URL.
    async fn spawn_stub(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/v1beta/models/*rest",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        serve(app).await
    }

    /// Echoes the prompt back when the expected key is presented.
    async fn spawn_echo(expected_key: &'static str) -> String {
        let app = Router::new().route(
            "/v1beta/models/*rest",
            post(move |headers: HeaderMap, Json(req): Json<Value>| async move {
                let key = headers
                    .get(API_KEY_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                if key != expected_key {
                    return (
                        StatusCode::FORBIDDEN,
                        Json(json!({"error": {"code": 403, "message": "bad key"}})),
                    );
                }
                let prompt = req["contents"][0]["parts"][0]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                (
                    StatusCode::OK,
                    Json(json!({
                        "candidates": [{
                            "content": {"role": "model", "parts": [{"text": format!("echo: {prompt}")}]},
                            "finishReason": "STOP"
                        }],
                        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
                    })),
                )
            }),
        );
        serve(app).await
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_invalid_key_body_is_authentication() {
        let err = classify_status(400, INVALID_KEY_BODY);
        assert_eq!(
            err,
            ModelError::Authentication("API key not valid. Please pass a valid API key.".to_string())
        );
    }

    #[test]
    fn test_forbidden_is_authentication() {
        assert!(matches!(
            classify_status(403, "denied"),
            ModelError::Authentication(_)
        ));
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_transient() {
        assert!(matches!(classify_status(429, "slow down"), ModelError::Transient(_)));
        assert!(matches!(classify_status(503, "overloaded"), ModelError::Transient(_)));
    }

    #[test]
    fn test_other_client_errors_are_unknown() {
        let err = classify_status(404, r#"{"error": {"message": "model not found"}}"#);
        assert_eq!(err, ModelError::Unknown("status 404: model not found".to_string()));
    }

    #[test]
    fn test_response_text_joins_parts_of_first_candidate() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "**Match Score:** 80%\n"}, {"text": "**Profile Summary:** ok"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(
            parsed.text().as_deref(),
            Some("**Match Score:** 80%\n**Profile Summary:** ok")
        );
    }

    #[test]
    fn test_blocked_prompt_has_no_text() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(parsed.text().is_none());
        assert!(parsed.empty_reason().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_empty_key_fails_without_network() {
        // Port 9 is never contacted: the key check comes first.
        let client = GeminiClient::new("", "http://127.0.0.1:9").unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_generate_returns_model_text() {
        let base = spawn_echo("test-key").await;
        let client = GeminiClient::new("test-key", &base).unwrap();
        let text = client.generate("Screen this resume").await.unwrap();
        assert_eq!(text, "echo: Screen this resume");
    }

    #[tokio::test]
    async fn test_wrong_key_is_authentication() {
        let base = spawn_echo("test-key").await;
        let client = GeminiClient::new("other-key", &base).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_invalid_key_response_is_authentication() {
        let body: Value = serde_json::from_str(INVALID_KEY_BODY).unwrap();
        let base = spawn_stub(StatusCode::BAD_REQUEST, body).await;
        let client = GeminiClient::new("bogus", &base).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_service_unavailable_is_transient() {
        let base = spawn_stub(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({"error": {"code": 503, "message": "The model is overloaded."}}),
        )
        .await;
        let client = GeminiClient::new("key", &base).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Transient(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = GeminiClient::new("key", &format!("http://{addr}")).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Transient(_)));
    }

    #[tokio::test]
    async fn test_success_without_text_is_unknown() {
        let base = spawn_stub(
            StatusCode::OK,
            json!({"candidates": [{"finishReason": "SAFETY"}]}),
        )
        .await;
        let client = GeminiClient::new("key", &base).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Unknown(msg) if msg.contains("SAFETY")));
    }
}
