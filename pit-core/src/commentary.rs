//! AI commentary contract
//!
//! The commentary backend is an external collaborator. This module defines
//! what it is asked (`CommentaryRequest`, always built from snapshots),
//! what it may answer (free text or a `StrategyRecommendation`) and how
//! its failures are described. Nothing here touches simulation state.

use crate::model::{CarState, RaceResult, RaceState, TelemetrySample};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommentaryError {
    #[error("AI commentary is not configured (no API key)")]
    NotConfigured,

    #[error("request to commentary service failed: {0}")]
    Transport(String),

    #[error("commentary service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("commentary service returned no text")]
    EmptyResponse,

    #[error("malformed commentary payload: {0}")]
    Malformed(String),

    #[error("invalid field `{field}` in commentary payload: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl CommentaryError {
    /// Message shown in the commentary panel
    pub fn user_message(&self) -> String {
        match self {
            CommentaryError::NotConfigured => {
                "AI commentary is unavailable: no API key is configured.".to_string()
            }
            other => format!(
                "Could not generate analysis. Please check your API key and network connection. Details: {}",
                other
            ),
        }
    }
}

/// Backend that turns prompts into text
///
/// `complete_json` asks the backend for a JSON-only answer; the caller is
/// responsible for validating it.
#[async_trait]
pub trait CommentaryProvider: Send + Sync {
    /// Short name used in logs (e.g. "gemini")
    fn name(&self) -> &str;

    async fn complete_text(&self, prompt: &str) -> Result<String, CommentaryError>;

    async fn complete_json(&self, prompt: &str) -> Result<String, CommentaryError>;
}

// =============================================================================
// Requests
// =============================================================================

/// Alternate strategy explored by a what-if scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatIfScenario {
    pub car_number: String,
    pub decision_lap: u32,
    pub action: String,
    /// Classified finishing position, if the car is in the results table
    pub original_finish: Option<u32>,
    pub total_laps: u32,
    pub laps: Vec<TelemetrySample>,
}

/// Everything a commentary call can be about. Payloads are owned copies or
/// shared immutable snapshots, never live references.
#[derive(Debug, Clone)]
pub enum CommentaryRequest {
    RaceHistory {
        results: Vec<RaceResult>,
    },
    Strategy {
        car: CarState,
        total_laps: u32,
    },
    WhatIf(WhatIfScenario),
    DriverAnalysis {
        car_number: String,
        laps: Vec<TelemetrySample>,
    },
    HeadToHead {
        first: CarState,
        second: CarState,
        first_laps: Vec<TelemetrySample>,
        second_laps: Vec<TelemetrySample>,
    },
    Question {
        question: String,
        race: Arc<RaceState>,
        total_laps: u32,
    },
}

impl CommentaryRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            CommentaryRequest::RaceHistory { .. } => "history",
            CommentaryRequest::Strategy { .. } => "strategy",
            CommentaryRequest::WhatIf(_) => "what-if",
            CommentaryRequest::DriverAnalysis { .. } => "driver",
            CommentaryRequest::HeadToHead { .. } => "head-to-head",
            CommentaryRequest::Question { .. } => "ask",
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    PitNow,
    #[serde(rename = "PIT_IN_2_LAPS")]
    PitIn2Laps,
    StayOut,
    Push,
    ConserveTires,
}

impl Recommendation {
    /// Human-readable label, e.g. "PIT IN 2 LAPS"
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::PitNow => "PIT NOW",
            Recommendation::PitIn2Laps => "PIT IN 2 LAPS",
            Recommendation::StayOut => "STAY OUT",
            Recommendation::Push => "PUSH",
            Recommendation::ConserveTires => "CONSERVE TIRES",
        }
    }
}

/// Urgency colour of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Red,
    Yellow,
    Green,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRecommendation {
    pub recommendation: Recommendation,
    /// 0-100
    pub confidence: u8,
    pub reasoning: String,
    pub color: Urgency,
}

/// Wire shape before validation; every field is checked by hand so bad
/// values produce a precise `InvalidField`
#[derive(Deserialize)]
struct RawRecommendation {
    recommendation: serde_json::Value,
    confidence: serde_json::Value,
    reasoning: serde_json::Value,
    color: serde_json::Value,
}

/// Remove a surrounding markdown code fence such as ```` ```json ... ``` ````
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

impl StrategyRecommendation {
    /// Parse and validate a backend JSON answer
    pub fn parse(text: &str) -> Result<Self, CommentaryError> {
        let body = strip_code_fence(text);
        if body.is_empty() {
            return Err(CommentaryError::EmptyResponse);
        }

        let raw: RawRecommendation =
            serde_json::from_str(body).map_err(|e| CommentaryError::Malformed(e.to_string()))?;

        let recommendation: Recommendation = serde_json::from_value(raw.recommendation.clone())
            .map_err(|_| CommentaryError::InvalidField {
                field: "recommendation",
                reason: format!("unknown recommendation {}", raw.recommendation),
            })?;

        let confidence = raw
            .confidence
            .as_f64()
            .filter(|c| (0.0..=100.0).contains(c))
            .ok_or_else(|| CommentaryError::InvalidField {
                field: "confidence",
                reason: format!("expected a number between 0 and 100, got {}", raw.confidence),
            })?;

        let reasoning = raw
            .reasoning
            .as_str()
            .ok_or_else(|| CommentaryError::InvalidField {
                field: "reasoning",
                reason: "expected a string".to_string(),
            })?
            .to_string();

        let color: Urgency =
            serde_json::from_value(raw.color.clone()).map_err(|_| CommentaryError::InvalidField {
                field: "color",
                reason: format!("expected red, yellow or green, got {}", raw.color),
            })?;

        Ok(Self {
            recommendation,
            confidence: confidence.round() as u8,
            reasoning,
            color,
        })
    }
}

/// Answer to a commentary request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommentaryResponse {
    Text { body: String },
    Recommendation(StrategyRecommendation),
}
