/// Hosted-model client module.
///
/// This module provides the `AgentClient` abstraction the answerer depends on,
/// and a Groq implementation that talks to the OpenAI-compatible chat
/// completions API, including error handling, retry logic, and streaming.
mod client;
mod sse;

pub use client::{
    AgentClient, DEFAULT_BASE_URL, DEFAULT_MODEL, DeltaSink, GroqClient, GroqClientBuilder,
    ProviderError, retry_with_backoff,
};
