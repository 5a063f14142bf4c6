//! Question answering implementation.

use std::sync::Arc;

use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use crate::markdown::{extract_links, flatten};
use crate::provider::{AgentClient, DeltaSink};

use super::types::{AnswerResult, AskError, Question};

/// System instructions for the hosted agent.
pub const AGENT_INSTRUCTIONS: &str = "You are TerraNaut, an expert analyst of NASA Terra satellite data.
- Answer general questions simply.
- Answer specific questions in detail.
- Use web search when it helps, and cite references as Markdown links.
- Keep answers concise and focused on real-world impact.
- Respond in Markdown.";

/// Answers questions by delegating to a hosted agent.
pub struct QuestionAnswerer {
    client: Arc<dyn AgentClient>,
}

impl QuestionAnswerer {
    /// Creates a new `QuestionAnswerer` with the specified client.
    #[must_use]
    pub fn new(client: Arc<dyn AgentClient>) -> Self {
        Self { client }
    }

    /// Returns the identifier of the model answering questions.
    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Answers a question.
    ///
    /// The question is validated before the agent is called. Agent failures
    /// are returned as-is; nothing is retried here.
    pub async fn answer(&self, question: &Question) -> Result<AnswerResult, AskError> {
        question.validate()?;
        let prompt = question.prompt();
        info!(
            model = self.model(),
            temperature = question.temperature,
            has_context = question.context.is_some(),
            "asking agent"
        );
        debug!(prompt_len = prompt.len(), "prompt built");

        let markdown = self.client.generate(&prompt, question.temperature).await?;
        Ok(self.finish(&markdown, question))
    }

    /// Answers a question, forwarding answer fragments to `on_delta` as the
    /// agent produces them.
    pub async fn answer_streaming(
        &self,
        question: &Question,
        on_delta: DeltaSink<'_>,
    ) -> Result<AnswerResult, AskError> {
        question.validate()?;
        let prompt = question.prompt();
        info!(
            model = self.model(),
            temperature = question.temperature,
            "asking agent (streaming)"
        );

        let markdown = self
            .client
            .generate_stream(&prompt, question.temperature, on_delta)
            .await?;
        Ok(self.finish(&markdown, question))
    }

    fn finish(&self, markdown: &str, question: &Question) -> AnswerResult {
        let result = assemble(
            markdown,
            self.model(),
            question.temperature,
            question.return_sources,
        );
        info!(
            markdown_len = result.markdown().len(),
            sources = result.sources().len(),
            "answer assembled"
        );
        result
    }
}

/// Packages an agent reply into an [`AnswerResult`].
///
/// The reply is trimmed, flattened to plain text, and, when
/// `include_sources` is set, scanned for hyperlinks. `meta` records the
/// model, the temperature, and when the answer was assembled.
pub fn assemble(
    markdown: &str,
    model: &str,
    temperature: f64,
    include_sources: bool,
) -> AnswerResult {
    let markdown = markdown.trim();
    let text = flatten(markdown);
    let sources = if include_sources {
        extract_links(markdown)
    } else {
        Vec::new()
    };

    let mut meta = Map::new();
    meta.insert("model".to_string(), Value::from(model));
    meta.insert("temperature".to_string(), Value::from(temperature));
    if let Ok(now) = OffsetDateTime::now_utc().format(&Rfc3339) {
        meta.insert("generated_at".to_string(), Value::from(now));
    }

    AnswerResult::new(markdown.to_string(), text, sources, meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::SourceItem;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockAgent {
        response: Result<String, String>,
        prompts: Mutex<Vec<(String, f64)>>,
    }

    impl MockAgent {
        fn answering(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                response: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AgentClient for MockAgent {
        fn model(&self) -> &str {
            "mock-model"
        }

        async fn generate(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), temperature));
            self.response.clone().map_err(|message| ProviderError::Api { message })
        }
    }

    const TERRA_ANSWER: &str =
        "Terra launched in [1999](https://terra.nasa.gov).\n\n**Impact:** climate monitoring.";

    #[test]
    fn assemble_produces_all_three_shapes() {
        let result = assemble(TERRA_ANSWER, "llama", 0.2, true);

        assert_eq!(result.markdown(), TERRA_ANSWER);
        assert_eq!(
            result.text(),
            "Terra launched in 1999.\n\nImpact: climate monitoring."
        );
        assert_eq!(
            result.sources(),
            &[SourceItem::new("1999", "https://terra.nasa.gov")]
        );
        assert_eq!(result.model(), Some("llama"));
        assert_eq!(result.meta()["temperature"], 0.2);
        assert!(result.meta().contains_key("generated_at"));
    }

    #[test]
    fn assemble_skips_sources_when_not_requested() {
        let result = assemble(TERRA_ANSWER, "llama", 0.2, false);
        assert!(result.sources().is_empty());
        assert_eq!(
            result.text(),
            "Terra launched in 1999.\n\nImpact: climate monitoring."
        );
    }

    #[test]
    fn assemble_trims_markdown() {
        let result = assemble("\n  **hi**  \n", "m", 0.2, true);
        assert_eq!(result.markdown(), "**hi**");
        assert_eq!(result.text(), "hi");
    }

    #[tokio::test]
    async fn answer_sends_prompt_and_temperature() {
        let agent = Arc::new(MockAgent::answering(TERRA_ANSWER));
        let answerer = QuestionAnswerer::new(agent.clone());

        let question = Question::new("When did Terra launch?")
            .with_context("NASA EOS")
            .with_temperature(0.7);
        let result = answerer.answer(&question).await.unwrap();

        assert_eq!(result.sources().len(), 1);
        let prompts = agent.prompts.lock().unwrap();
        assert_eq!(
            prompts.as_slice(),
            &[(
                "Context:\nNASA EOS\n\nQuestion:\nWhen did Terra launch?".to_string(),
                0.7
            )]
        );
    }

    #[tokio::test]
    async fn invalid_question_never_reaches_agent() {
        let agent = Arc::new(MockAgent::answering("unused"));
        let answerer = QuestionAnswerer::new(agent.clone());

        let err = answerer.answer(&Question::new("   ")).await.unwrap_err();
        assert!(matches!(err, AskError::EmptyQuestion));

        let err = answerer
            .answer(&Question::new("q").with_temperature(2.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::TemperatureOutOfRange(_)));

        assert!(agent.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn agent_failure_propagates() {
        let answerer = QuestionAnswerer::new(Arc::new(MockAgent::failing("quota exceeded")));

        let err = answerer.answer(&Question::new("q")).await.unwrap_err();
        assert!(matches!(err, AskError::Provider(_)));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn answer_streaming_forwards_fragments() {
        let answerer = QuestionAnswerer::new(Arc::new(MockAgent::answering(TERRA_ANSWER)));

        let mut streamed = String::new();
        let result = answerer
            .answer_streaming(&Question::new("q"), &mut |delta: &str| {
                streamed.push_str(delta)
            })
            .await
            .unwrap();

        assert_eq!(streamed, TERRA_ANSWER);
        assert_eq!(result.markdown(), TERRA_ANSWER);
    }

    #[test]
    fn model_comes_from_client() {
        let answerer = QuestionAnswerer::new(Arc::new(MockAgent::answering("")));
        assert_eq!(answerer.model(), "mock-model");
    }
}
