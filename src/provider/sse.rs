//! Server-sent event decoding for streamed chat completions.

use std::fmt::Display;

use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use super::client::{DeltaSink, ProviderError};

/// One decoded SSE event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SseData {
    /// A text fragment of the answer.
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
    /// Empty payloads and chunks without content.
    Skip,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
}

/// Decodes the `data` payload of a single `text/event-stream` event.
pub(crate) fn parse_data(data: &str) -> Result<SseData, ProviderError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseData::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseData::Done);
    }

    let chunk: ChatCompletionChunk =
        serde_json::from_str(data).map_err(ProviderError::Serialization)?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Api {
            message: error.message,
        });
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map_or(SseData::Skip, SseData::Delta))
}

/// Drives a streamed chat-completion body to the end, handing each text
/// fragment to `on_delta` and returning the concatenated answer.
pub(crate) async fn read_stream<S, B, E>(
    body: S,
    on_delta: DeltaSink<'_>,
) -> Result<String, ProviderError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ProviderError> + Display,
{
    let mut events = std::pin::pin!(body.eventsource());
    let mut answer = String::new();

    while let Some(event) = events.next().await {
        let event = event.map_err(stream_error)?;
        match parse_data(&event.data)? {
            SseData::Delta(text) => {
                on_delta(&text);
                answer.push_str(&text);
            }
            SseData::Done => return Ok(answer),
            SseData::Skip => {}
        }
    }

    debug!("stream ended without [DONE] sentinel");
    Ok(answer)
}

fn stream_error<E>(error: EventStreamError<E>) -> ProviderError
where
    E: Into<ProviderError> + Display,
{
    match error {
        EventStreamError::Transport(error) => error.into(),
        other => ProviderError::Api {
            message: format!("SSE stream error: {other}"),
        },
    }
}
