//! Interactive question-and-answer console.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::answerer::{Question, QuestionAnswerer};

/// Words that end the session, compared case-insensitively.
const EXIT_COMMANDS: [&str; 3] = ["quit", "exit", "bye"];

/// Returns true if `line` asks to end the session.
pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    EXIT_COMMANDS
        .iter()
        .any(|command| line.eq_ignore_ascii_case(command))
}

/// Runs the console until an exit command or end of input.
///
/// Each non-empty line is sent to the agent and the answer is streamed to
/// `output` as it arrives. Agent failures are reported and the loop goes on.
pub async fn run_console<R, W>(answerer: &QuestionAnswerer, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
{
    writeln!(output, "\n=== Interactive Terra QnA ===")?;
    writeln!(output, "🌍 Terra 25th Anniversary QnA Chatbot")?;
    writeln!(output, "Ask me anything about Terra satellite data!")?;

    let mut lines = input.lines();
    loop {
        write!(output, "\nUser: ")?;
        output.flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            writeln!(output, "\n🛰️ Goodbye!")?;
            break;
        };
        let question = line.trim();

        if is_exit_command(question) {
            writeln!(output, "🛰️ Thanks! Keep exploring Terra data!")?;
            break;
        }
        if question.is_empty() {
            continue;
        }

        write!(output, "Terra Bot: ")?;
        output.flush()?;

        let result = answerer
            .answer_streaming(&Question::new(question), &mut |delta: &str| {
                // A broken stdout resurfaces on the next prompt write.
                let _ = write!(output, "{delta}");
                let _ = output.flush();
            })
            .await;

        match result {
            Ok(_) => writeln!(output)?,
            Err(err) => {
                warn!(%err, "console question failed");
                writeln!(output, "\n⚠️ {err}")?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AgentClient, ProviderError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct EchoAgent {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AgentClient for EchoAgent {
        fn model(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str, _temperature: f64) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if prompt.contains("fail") {
                return Err(ProviderError::Api {
                    message: "agent unavailable".to_string(),
                });
            }
            Ok(format!("**echo** {}", prompt.replace("Question:\n", "")))
        }
    }

    fn echo_answerer() -> (Arc<EchoAgent>, QuestionAnswerer) {
        let agent = Arc::new(EchoAgent {
            prompts: Mutex::new(Vec::new()),
        });
        let answerer = QuestionAnswerer::new(agent.clone());
        (agent, answerer)
    }

    #[test]
    fn exit_commands_are_case_insensitive() {
        for line in ["quit", "EXIT", " Bye ", "Quit\n"] {
            assert!(is_exit_command(line), "{line:?} should exit");
        }
    }

    #[test]
    fn other_lines_are_not_exit_commands() {
        for line in ["", "quit now", "goodbye", "exit?"] {
            assert!(!is_exit_command(line), "{line:?} should not exit");
        }
    }

    #[tokio::test]
    async fn console_answers_until_exit() {
        let (agent, answerer) = echo_answerer();
        let input: &[u8] = b"What is MODIS?\n\n   \nbye\nnever asked\n";
        let mut output = Vec::new();

        run_console(&answerer, input, &mut output).await.unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("Terra Bot: **echo** What is MODIS?"));
        assert!(transcript.contains("Keep exploring Terra data!"));
        assert_eq!(
            agent.prompts.lock().unwrap().as_slice(),
            &["Question:\nWhat is MODIS?".to_string()]
        );
    }

    #[tokio::test]
    async fn console_stops_at_end_of_input() {
        let (agent, answerer) = echo_answerer();
        let input: &[u8] = b"";
        let mut output = Vec::new();

        run_console(&answerer, input, &mut output).await.unwrap();

        assert!(String::from_utf8(output).unwrap().contains("Goodbye!"));
        assert!(agent.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn console_reports_errors_and_continues() {
        let (agent, answerer) = echo_answerer();
        let input: &[u8] = b"please fail\nsecond question\nexit\n";
        let mut output = Vec::new();

        run_console(&answerer, input, &mut output).await.unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("agent unavailable"));
        assert!(transcript.contains("**echo** second question"));
        assert_eq!(agent.prompts.lock().unwrap().len(), 2);
    }
}
