//! Request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::answerer::{AnswerResult, DEFAULT_TEMPERATURE, Question};
use crate::markdown::SourceItem;

/// Body of `POST /v1/ask`.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_return_sources")]
    pub return_sources: bool,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_return_sources() -> bool {
    true
}

impl From<AskRequest> for Question {
    fn from(req: AskRequest) -> Self {
        Self {
            text: req.question,
            context: req.context,
            temperature: req.temperature,
            return_sources: req.return_sources,
        }
    }
}

/// Successful answer.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub ok: bool,
    pub message_markdown: String,
    pub message_text: String,
    pub sources: Vec<SourceItem>,
    pub meta: Map<String, Value>,
}

impl From<AnswerResult> for AskResponse {
    fn from(result: AnswerResult) -> Self {
        Self {
            ok: true,
            message_markdown: result.markdown().to_string(),
            message_text: result.text().to_string(),
            sources: result.sources().to_vec(),
            meta: result.meta().clone(),
        }
    }
}

/// Error body, shaped `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}
