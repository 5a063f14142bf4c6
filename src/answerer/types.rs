//! Types for question answering requests and results.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::markdown::SourceItem;
use crate::provider::ProviderError;

/// Sampling temperature used when the caller doesn't pick one.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Errors produced while answering a question.
#[derive(Debug, Error)]
pub enum AskError {
    /// The question was empty or whitespace-only
    #[error("Question cannot be empty")]
    EmptyQuestion,

    /// Temperature outside of `[0.0, 1.0]`
    #[error("Temperature must be between 0.0 and 1.0, got {0}")]
    TemperatureOutOfRange(f64),

    /// The hosted agent failed to produce an answer
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AskError {
    /// Returns true for errors caused by invalid input rather than the agent.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::EmptyQuestion | Self::TemperatureOutOfRange(_))
    }
}

/// A question to put to the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// The question text
    pub text: String,
    /// Optional background placed ahead of the question
    pub context: Option<String>,
    /// Sampling temperature (0.0-1.0)
    pub temperature: f64,
    /// Whether to extract hyperlinks from the answer
    pub return_sources: bool,
}

impl Question {
    /// Creates a question with the default temperature and sources enabled.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
            temperature: DEFAULT_TEMPERATURE,
            return_sources: true,
        }
    }

    /// Sets the background context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Enables or disables source extraction.
    pub fn with_sources(mut self, return_sources: bool) -> Self {
        self.return_sources = return_sources;
        self
    }

    /// Checks the question before anything is sent to the agent.
    pub fn validate(&self) -> Result<(), AskError> {
        if self.text.trim().is_empty() {
            return Err(AskError::EmptyQuestion);
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(AskError::TemperatureOutOfRange(self.temperature));
        }
        Ok(())
    }

    /// Builds the prompt sent to the agent.
    ///
    /// Context, when present and non-empty, comes first:
    ///
    /// ```text
    /// Context:
    /// <context>
    ///
    /// Question:
    /// <question>
    /// ```
    pub fn prompt(&self) -> String {
        let question = self.text.trim();
        match self.context.as_deref().filter(|c| !c.is_empty()) {
            Some(context) => format!("Context:\n{context}\n\nQuestion:\n{question}"),
            None => format!("Question:\n{question}"),
        }
    }
}

/// The agent's answer in its three shapes, plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    /// The agent's reply, trimmed
    markdown: String,
    /// The reply flattened to plain text
    text: String,
    /// Hyperlinks found in the reply, in order of appearance
    sources: Vec<SourceItem>,
    /// Free-form metadata; always carries `model`
    meta: Map<String, Value>,
}

impl AnswerResult {
    /// Creates a new answer result.
    pub fn new(
        markdown: String,
        text: String,
        sources: Vec<SourceItem>,
        meta: Map<String, Value>,
    ) -> Self {
        Self {
            markdown,
            text,
            sources,
            meta,
        }
    }

    /// Returns the raw Markdown answer.
    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    /// Returns the plain-text answer.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the extracted sources.
    pub fn sources(&self) -> &[SourceItem] {
        &self.sources
    }

    /// Returns the metadata map.
    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// Returns the identifier of the model that produced the answer.
    pub fn model(&self) -> Option<&str> {
        self.meta.get("model").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_question_uses_defaults() {
        let question = Question::new("What is MODIS?");
        assert_eq!(question.temperature, DEFAULT_TEMPERATURE);
        assert!(question.return_sources);
        assert!(question.context.is_none());
    }

    #[test]
    fn prompt_without_context() {
        let question = Question::new("  What is MODIS?  ");
        assert_eq!(question.prompt(), "Question:\nWhat is MODIS?");
    }

    #[test]
    fn prompt_with_context_puts_context_first() {
        let question = Question::new("When did it launch?").with_context("Terra satellite");
        assert_eq!(
            question.prompt(),
            "Context:\nTerra satellite\n\nQuestion:\nWhen did it launch?"
        );
    }

    #[test]
    fn empty_context_is_ignored() {
        let question = Question::new("Why?").with_context("");
        assert_eq!(question.prompt(), "Question:\nWhy?");
    }

    #[test]
    fn validate_rejects_blank_question() {
        let err = Question::new(" \n\t ").validate().unwrap_err();
        assert!(matches!(err, AskError::EmptyQuestion));
        assert!(err.is_user_error());
    }

    #[test]
    fn validate_accepts_temperature_bounds() {
        assert!(Question::new("q").with_temperature(0.0).validate().is_ok());
        assert!(Question::new("q").with_temperature(1.0).validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        for temperature in [-0.1, 1.01, f64::NAN, f64::INFINITY] {
            let err = Question::new("q")
                .with_temperature(temperature)
                .validate()
                .unwrap_err();
            assert!(matches!(err, AskError::TemperatureOutOfRange(_)));
        }
    }

    #[test]
    fn provider_errors_are_not_user_errors() {
        let err = AskError::from(ProviderError::Api {
            message: "boom".to_string(),
        });
        assert!(!err.is_user_error());
        assert_eq!(err.to_string(), "Provider API error: boom");
    }

    #[test]
    fn answer_result_exposes_model_from_meta() {
        let mut meta = Map::new();
        meta.insert("model".to_string(), Value::from("llama-3.1-8b-instant"));
        let result = AnswerResult::new(String::new(), String::new(), Vec::new(), meta);
        assert_eq!(result.model(), Some("llama-3.1-8b-instant"));
    }
}
