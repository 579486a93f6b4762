//! `POST /api/chat`: validates the body and relays completion deltas as SSE.
//!
//! Every stream ends with exactly one terminal frame, either the `[DONE]`
//! sentinel or a single `{"error": ...}` event. Nothing is pulled from the
//! upstream until the response body is polled, and dropping the body (client
//! disconnect) drops the upstream stream with it.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::header,
    response::{sse::Event, IntoResponse, Response, Sse},
};
use chat_relay_shared::{ChatMessage, ChatRequest, StreamEvent, DONE_SENTINEL};
use futures_util::stream::{self, Stream, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::RelayError;
use crate::llm::{CompletionClient, DeltaStream};

/// The only error text clients ever see for upstream failures.
pub const UPSTREAM_ERROR_MESSAGE: &str = "Failed to get a response from the AI service";

pub async fn chat(body: Bytes, client: Arc<dyn CompletionClient>) -> Result<Response, RelayError> {
    let request_id = Uuid::new_v4().to_string();

    let messages = parse_messages(&body).map_err(|e| {
        warn!(request_id = %request_id, "Rejected chat request: {}", e);
        RelayError::InvalidMessageFormat
    })?;

    info!(
        request_id = %request_id,
        messages = messages.len(),
        model = client.model(),
        "Chat request"
    );

    let events = relay_events(client, messages, request_id);
    Ok(([(header::CONNECTION, "keep-alive")], Sse::new(events)).into_response())
}

/// `messages` must be present and an array. Each element must also be a
/// well-formed chat message (known role, string content): the relay forwards
/// typed messages upstream, so a malformed element is rejected here with the
/// same 400 instead of surfacing later as an in-band upstream error.
pub fn parse_messages(body: &[u8]) -> Result<Vec<ChatMessage>, serde_json::Error> {
    serde_json::from_slice::<ChatRequest>(body).map(|request| request.messages)
}

enum RelayState {
    Connecting {
        client: Arc<dyn CompletionClient>,
        messages: Vec<ChatMessage>,
    },
    Streaming {
        deltas: DeltaStream,
        sent: usize,
    },
    Finished,
}

/// Turn one chat exchange into the SSE frames written to the client.
pub fn relay_events(
    client: Arc<dyn CompletionClient>,
    messages: Vec<ChatMessage>,
    request_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream::unfold(
        RelayState::Connecting { client, messages },
        move |state| {
            let request_id = request_id.clone();
            async move {
                match state {
                    RelayState::Connecting { client, messages } => {
                        match client.stream_chat(messages).await {
                            Ok(deltas) => next_frame(deltas, 0, &request_id).await,
                            Err(e) => {
                                error!(request_id = %request_id, "Upstream request failed: {}", e);
                                Some((Ok(error_frame()), RelayState::Finished))
                            }
                        }
                    }
                    RelayState::Streaming { deltas, sent } => {
                        next_frame(deltas, sent, &request_id).await
                    }
                    RelayState::Finished => None,
                }
            }
        },
    )
}

async fn next_frame(
    mut deltas: DeltaStream,
    sent: usize,
    request_id: &str,
) -> Option<(Result<Event, Infallible>, RelayState)> {
    loop {
        match deltas.next().await {
            Some(Ok(delta)) if delta.is_empty() => continue,
            Some(Ok(delta)) => {
                let frame = event_frame(&StreamEvent::content(delta));
                return Some((Ok(frame), RelayState::Streaming { deltas, sent: sent + 1 }));
            }
            Some(Err(e)) => {
                error!(request_id, fragments = sent, "Upstream stream failed: {}", e);
                return Some((Ok(error_frame()), RelayState::Finished));
            }
            None => {
                info!(request_id, fragments = sent, "Chat stream completed");
                return Some((Ok(Event::default().data(DONE_SENTINEL)), RelayState::Finished));
            }
        }
    }
}

fn event_frame(event: &StreamEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_default())
}

fn error_frame() -> Event {
    event_frame(&StreamEvent::error(UPSTREAM_ERROR_MESSAGE))
}
