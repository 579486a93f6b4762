//! Simulated completion stream used when no credentials are configured.

use std::time::Duration;

use async_trait::async_trait;
use chat_relay_shared::ChatMessage;
use futures_util::stream::{self, StreamExt};

use crate::error::RelayError;
use crate::llm::{CompletionClient, DeltaStream};

pub const MOCK_MESSAGE: &str = "This is a mock response because no API key is configured. \
To get real AI responses, set AZURE_OPENAI_API_KEY together with AZURE_OPENAI_ENDPOINT, \
or set OPENAI_API_KEY, and restart the server.";
pub const MOCK_CHUNK_CHARS: usize = 5;
pub const MOCK_CHUNK_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct MockClient {
    message: String,
    chunk_chars: usize,
    delay: Duration,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            message: MOCK_MESSAGE.to_string(),
            chunk_chars: MOCK_CHUNK_CHARS,
            delay: MOCK_CHUNK_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn fragments(&self) -> Vec<String> {
        chunk_text(&self.message, self.chunk_chars)
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    fn mode(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn stream_chat(&self, _messages: Vec<ChatMessage>) -> Result<DeltaStream, RelayError> {
        let delay = self.delay;
        let fragments = stream::iter(self.fragments().into_iter().enumerate()).then(
            move |(i, fragment)| async move {
                if i > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok::<_, RelayError>(fragment)
            },
        );
        Ok(fragments.boxed())
    }
}

/// Split `text` into pieces of at most `size` code points.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}
