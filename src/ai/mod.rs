/// Inference module for localchat
///
/// This module talks to the language model. The model itself is an external
/// HTTP service; everything here is request shaping and response reading.
///
/// # Architecture
///
/// - `transcript` - Converts the stored conversation into the request message list
/// - `ollama` - Ollama `/api/chat` client, single-shot and streaming
///
/// # Usage
///
/// ```rust,no_run
/// use localchat::ai::{LLMBackend, OllamaBackend, build_request};
/// use localchat::config::ChatConfig;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = ChatConfig::from_env()?;
/// let backend = OllamaBackend::new(&config)?;
/// let messages = build_request(&[], "Hello!");
/// let reply = backend.complete(&messages, &config.model).await?;
/// # Ok(())
/// # }
/// ```
mod ollama;
mod transcript;

use crate::error::ChatResult;
use async_trait::async_trait;
use futures::stream::BoxStream;

pub use ollama::{OllamaBackend, parse_ollama_stream_line};
pub use transcript::{WireMessage, build_request};

/// Partial reply text, yielded as it arrives.
pub type TextStream = BoxStream<'static, ChatResult<String>>;

/// A chat-completion service.
#[async_trait]
pub trait LLMBackend: Send + Sync {
    /// One request, one full reply.
    async fn complete(&self, messages: &[WireMessage], model: &str) -> ChatResult<String>;

    /// Same request with streaming enabled; the reply arrives piece by piece.
    async fn stream(&self, messages: &[WireMessage], model: &str) -> ChatResult<TextStream>;

    /// Where requests go, for diagnostics.
    fn endpoint(&self) -> &str;
}
