//! Question answering backed by a hosted agent.
//!
//! This module provides the `QuestionAnswerer` struct which builds a prompt
//! from the user's question, delegates to an `AgentClient`, and reshapes the
//! Markdown reply into Markdown, plain text, and a list of sources.

mod question_answerer;
mod types;

pub use question_answerer::{AGENT_INSTRUCTIONS, QuestionAnswerer, assemble};
pub use types::{AnswerResult, AskError, DEFAULT_TEMPERATURE, Question};
