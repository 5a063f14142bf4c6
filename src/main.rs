use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use terranaut::answerer::{AGENT_INSTRUCTIONS, DEFAULT_TEMPERATURE};
use terranaut::console::run_console;
use terranaut::server::{self, AppState, AskResponse};
use terranaut::{AgentClient, AskError, GroqClientBuilder, Question, QuestionAnswerer};
use tracing_subscriber::EnvFilter;

/// terranaut - NASA Terra question answering over a hosted LLM agent
#[derive(Parser)]
#[command(name = "terranaut")]
#[command(about = "Ask questions about NASA Terra data, from the terminal or over HTTP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve(ServeCommand),
    /// Start an interactive question-and-answer session
    Chat,
    /// Ask a single question and print the answer
    Ask(AskCommand),
}

/// Serve the HTTP API
#[derive(Parser)]
struct ServeCommand {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
}

/// Ask a single question
#[derive(Parser)]
struct AskCommand {
    /// The question to ask
    #[arg(value_name = "QUESTION")]
    question: String,

    /// Background context placed ahead of the question
    #[arg(short, long)]
    context: Option<String>,

    /// Sampling temperature between 0.0 and 1.0
    #[arg(short, long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f64,

    /// Don't extract sources from the answer
    #[arg(long)]
    no_sources: bool,

    /// Print the full response as JSON instead of plain text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(cmd) => handle_serve(cmd).await,
        Commands::Chat => handle_chat().await,
        Commands::Ask(cmd) => handle_ask(cmd).await,
    };

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Logs go to stderr so answers on stdout stay clean.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("terranaut=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Determines if an error is a user error (vs provider or internal error).
fn is_user_error(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<AskError>()
        .is_some_and(AskError::is_user_error)
}

/// Builds the answerer from environment configuration.
///
/// Fails when `GROQ_API_KEY` is missing, so misconfiguration stops the
/// process before any question is taken.
fn build_answerer() -> Result<QuestionAnswerer> {
    let client = GroqClientBuilder::new()
        .instructions(AGENT_INSTRUCTIONS)
        .build()
        .context("Failed to configure the Groq client")?;
    tracing::info!(model = client.model(), "agent configured");
    Ok(QuestionAnswerer::new(Arc::new(client)))
}

async fn handle_serve(cmd: ServeCommand) -> Result<()> {
    let answerer = build_answerer()?;
    let addr = SocketAddr::new(cmd.host, cmd.port);
    server::serve(addr, AppState::new(answerer)).await
}

async fn handle_chat() -> Result<()> {
    let answerer = build_answerer()?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    tokio::select! {
        result = run_console(&answerer, stdin, &mut stdout) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n🛰️ Goodbye!");
            Ok(())
        }
    }
}

async fn handle_ask(cmd: AskCommand) -> Result<()> {
    let mut question = Question::new(cmd.question)
        .with_temperature(cmd.temperature)
        .with_sources(!cmd.no_sources);
    if let Some(context) = cmd.context {
        question = question.with_context(context);
    }
    // Reject bad input before requiring credentials.
    question.validate()?;

    let answerer = build_answerer()?;
    let result = answerer.answer(&question).await?;

    if cmd.json {
        let body = serde_json::to_string_pretty(&AskResponse::from(result))
            .context("Failed to serialize response")?;
        println!("{body}");
        return Ok(());
    }

    println!("{}", result.text());
    if !result.sources().is_empty() {
        println!("\nSources:");
        for source in result.sources() {
            println!(
                "- {} <{}>",
                source.title.as_deref().unwrap_or("untitled"),
                source.url.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}
