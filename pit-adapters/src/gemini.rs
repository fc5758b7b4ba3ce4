//! Gemini commentary backend
//!
//! Talks to the `generateContent` REST endpoint. Strategy calls ask for a
//! JSON-only answer through `generationConfig.responseMimeType`.

use async_trait::async_trait;
use pit_core::commentary::{CommentaryError, CommentaryProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Longest response body kept in a `Status` error
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// No key means commentary is disabled
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

impl GeminiConfig {
    pub fn has_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, json: bool) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: json.then_some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text).filter(|t| !t.trim().is_empty())
    }
}

// =============================================================================
// Client
// =============================================================================

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, CommentaryError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(CommentaryError::NotConfigured)?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| CommentaryError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn generate(&self, prompt: &str, json: bool) -> Result<String, CommentaryError> {
        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest::new(prompt, json))
            .send()
            .await
            .map_err(|e| CommentaryError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > ERROR_BODY_LIMIT {
                let cut = (0..=ERROR_BODY_LIMIT)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(CommentaryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CommentaryError::Malformed(e.without_url().to_string()))?;

        payload.text().ok_or(CommentaryError::EmptyResponse)
    }
}

#[async_trait]
impl CommentaryProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete_text(&self, prompt: &str) -> Result<String, CommentaryError> {
        self.generate(prompt, false).await
    }

    async fn complete_json(&self, prompt: &str) -> Result<String, CommentaryError> {
        self.generate(prompt, true).await
    }
}

/// Stand-in used when no API key is configured
pub struct UnconfiguredProvider;

#[async_trait]
impl CommentaryProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn complete_text(&self, _prompt: &str) -> Result<String, CommentaryError> {
        Err(CommentaryError::NotConfigured)
    }

    async fn complete_json(&self, _prompt: &str) -> Result<String, CommentaryError> {
        Err(CommentaryError::NotConfigured)
    }
}

/// Pick the commentary backend for a configuration
pub fn provider_from_config(config: &GeminiConfig) -> Arc<dyn CommentaryProvider> {
    if !config.has_key() {
        info!("No Gemini API key configured, AI commentary disabled");
        return Arc::new(UnconfiguredProvider);
    }

    match GeminiClient::new(config) {
        Ok(client) => {
            info!("AI commentary enabled (model {})", config.model);
            Arc::new(client)
        }
        Err(e) => {
            warn!("Failed to create Gemini client: {}", e);
            Arc::new(UnconfiguredProvider)
        }
    }
}
