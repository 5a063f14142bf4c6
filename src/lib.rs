pub mod answerer;
pub mod console;
pub mod markdown;
pub mod provider;
pub mod server;

pub use answerer::{AnswerResult, AskError, Question, QuestionAnswerer};
pub use markdown::{SourceItem, extract_links, flatten};
pub use provider::{AgentClient, GroqClient, GroqClientBuilder, ProviderError};
pub use server::{AppState, build_router};
