use anyhow::{bail, Result};
use chat_relay_shared::{
    sse::{SseDecoder, SseFrame},
    ChatMessage, ChatRequest, ErrorBody, StreamEvent,
};
use futures_util::StreamExt;
use tracing::{debug, warn};

/// How a relayed stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Completed(String),
    Failed { partial: String, error: String },
    /// The connection closed before any terminal frame arrived.
    Truncated(String),
}

/// Accumulates content frames until a terminal frame is seen.
#[derive(Debug, Default)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn handle_frame(&mut self, frame: SseFrame, on_delta: &mut impl FnMut(&str)) -> Option<StreamOutcome> {
        match frame {
            SseFrame::Event(StreamEvent::Content { content }) => {
                on_delta(&content);
                self.text.push_str(&content);
                None
            }
            SseFrame::Event(StreamEvent::Error { error }) => Some(StreamOutcome::Failed {
                partial: std::mem::take(&mut self.text),
                error,
            }),
            SseFrame::Done => Some(StreamOutcome::Completed(std::mem::take(&mut self.text))),
            SseFrame::Unrecognized(data) => {
                warn!("Ignoring unrecognized frame: {}", data);
                None
            }
        }
    }

    pub fn into_truncated(self) -> StreamOutcome {
        StreamOutcome::Truncated(self.text)
    }
}

pub struct RelayClient {
    http: reqwest::Client,
    chat_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Post the conversation and feed every content delta to `on_delta` as it arrives.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        mut on_delta: impl FnMut(&str),
    ) -> Result<StreamOutcome> {
        let request = ChatRequest {
            messages: messages.to_vec(),
        };
        debug!("Posting {} messages to {}", messages.len(), self.chat_url);

        let response = self.http.post(&self.chat_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            bail!("server returned {}: {}", status, message);
        }

        let mut decoder = SseDecoder::new();
        let mut transcript = Transcript::default();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            for frame in decoder.push(&chunk?) {
                if let Some(outcome) = transcript.handle_frame(frame, &mut on_delta) {
                    return Ok(outcome);
                }
            }
        }

        if decoder.has_pending() {
            warn!("Stream closed inside a frame");
        }
        Ok(transcript.into_truncated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_relay_shared::sse::decode_all;

    fn replay(body: &[u8]) -> (Vec<String>, StreamOutcome) {
        let mut seen = Vec::new();
        let mut transcript = Transcript::default();
        let mut outcome = None;
        for frame in decode_all(body) {
            outcome = transcript.handle_frame(frame, &mut |d: &str| seen.push(d.to_string()));
            if outcome.is_some() {
                break;
            }
        }
        let outcome = outcome.unwrap_or_else(|| transcript.into_truncated());
        (seen, outcome)
    }

    #[test]
    fn completed_stream_collects_all_deltas() {
        let (seen, outcome) =
            replay(b"data: {\"content\":\"Hi\"}\n\ndata: {\"content\":\" there\"}\n\ndata: [DONE]\n\n");
        assert_eq!(seen, ["Hi", " there"]);
        assert_eq!(outcome, StreamOutcome::Completed("Hi there".into()));
    }

    #[test]
    fn error_frame_keeps_partial_text() {
        let (_, outcome) = replay(b"data: {\"content\":\"Hal\"}\n\ndata: {\"error\":\"down\"}\n\n");
        assert_eq!(
            outcome,
            StreamOutcome::Failed {
                partial: "Hal".into(),
                error: "down".into()
            }
        );
    }

    #[test]
    fn missing_terminal_frame_is_truncated() {
        let (_, outcome) = replay(b"data: {\"content\":\"cut\"}\n\n");
        assert_eq!(outcome, StreamOutcome::Truncated("cut".into()));
    }

    #[test]
    fn chat_url_is_normalized() {
        assert_eq!(RelayClient::new("http://localhost:3001/").chat_url(), "http://localhost:3001/api/chat");
    }
}
