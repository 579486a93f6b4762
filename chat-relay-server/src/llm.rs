use std::sync::Arc;

use async_openai::{
    config::{AzureConfig, Config, OpenAIConfig},
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use chat_relay_shared::{ChatMessage, MessageRole};
use futures_util::stream::{BoxStream, StreamExt};
use tracing::info;

use crate::config::{ClientConfig, AZURE_API_VERSION};
use crate::error::RelayError;
use crate::mock::MockClient;

pub const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Answer clearly and concisely, and use Markdown when it helps readability.";
pub const MAX_TOKENS: u32 = 1000;
pub const TEMPERATURE: f32 = 0.7;

/// Lazily pulled text deltas. Dropping the stream stops reading upstream.
pub type DeltaStream = BoxStream<'static, Result<String, RelayError>>;

/// A source of streamed chat completions.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Upstream kind: `mock`, `azure` or `openai`.
    fn mode(&self) -> &str;

    /// Model or deployment the client answers with, for logging.
    fn model(&self) -> &str;

    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<DeltaStream, RelayError>;
}

/// Resolve the configured upstream into a client. Performs no network I/O.
pub fn build_client(config: &ClientConfig) -> Arc<dyn CompletionClient> {
    match config {
        ClientConfig::Mock => {
            info!("No API key configured, serving mock responses");
            Arc::new(MockClient::new())
        }
        ClientConfig::Azure {
            api_key,
            endpoint,
            deployment,
        } => {
            let azure = AzureConfig::new()
                .with_api_base(endpoint)
                .with_api_key(api_key)
                .with_deployment_id(deployment)
                .with_api_version(AZURE_API_VERSION);
            Arc::new(LiveClient::new(Client::with_config(azure), config.mode(), deployment.clone()))
        }
        ClientConfig::OpenAi { api_key, model } => {
            let openai = OpenAIConfig::new().with_api_key(api_key);
            Arc::new(LiveClient::new(Client::with_config(openai), config.mode(), model.clone()))
        }
    }
}

pub struct LiveClient<C: Config> {
    client: Client<C>,
    mode: &'static str,
    model: String,
}

impl<C: Config> LiveClient<C> {
    pub fn new(client: Client<C>, mode: &'static str, model: String) -> Self {
        info!(mode, "Initializing live completion client with model: {}", model);
        Self { client, mode, model }
    }

    /// System instruction first, then the caller's messages in order.
    pub fn build_request(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<CreateChatCompletionRequest, RelayError> {
        let system_message = ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT.to_string())
                .build()?,
        );

        let mut upstream = Vec::with_capacity(1 + messages.len());
        upstream.push(system_message);
        for msg in messages {
            upstream.push(convert_to_openai_message(msg)?);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(upstream)
            .max_tokens(MAX_TOKENS)
            .temperature(TEMPERATURE)
            .stream(true)
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl<C> CompletionClient for LiveClient<C>
where
    C: Config + Send + Sync + 'static,
{
    fn mode(&self) -> &str {
        self.mode
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<DeltaStream, RelayError> {
        let request = self.build_request(messages)?;
        let stream = self.client.chat().create_stream(request).await?;

        let deltas = stream.filter_map(|result| async move {
            match result {
                Ok(response) => response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .filter(|delta| !delta.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(RelayError::from(e))),
            }
        });
        Ok(deltas.boxed())
    }
}

fn convert_to_openai_message(msg: ChatMessage) -> Result<ChatCompletionRequestMessage, RelayError> {
    let message = match msg.role {
        MessageRole::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content)
                .build()?,
        ),
        MessageRole::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content)
                .build()?,
        ),
        MessageRole::Assistant => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(msg.content)
                .build()?,
        ),
    };
    Ok(message)
}
