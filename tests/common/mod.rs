//! Shared fakes for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use localchat::ai::{LLMBackend, TextStream, WireMessage};
use localchat::controller::{IndicatorHandle, RenderSurface};
use localchat::error::{ChatError, ChatResult};
use localchat::storage::KeyValueStore;
use localchat::types::{Role, SessionSummary};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const FAKE_ENDPOINT: &str = "http://localhost:11434/api/chat";

/// Replies with queued results, in order, and remembers every request.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<ChatResult<String>>>,
    requests: Mutex<Vec<(Vec<WireMessage>, String)>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<ChatResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(Vec<WireMessage>, String)> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, messages: &[WireMessage], model: &str) -> ChatResult<String> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), model.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ChatError::MalformedResponse))
    }
}

#[async_trait]
impl LLMBackend for ScriptedBackend {
    async fn complete(&self, messages: &[WireMessage], model: &str) -> ChatResult<String> {
        self.next_reply(messages, model)
    }

    async fn stream(&self, messages: &[WireMessage], model: &str) -> ChatResult<TextStream> {
        let reply = self.next_reply(messages, model)?;
        Ok(futures::stream::iter([Ok(reply)]).boxed())
    }

    fn endpoint(&self) -> &str {
        FAKE_ENDPOINT
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    Message(Role, String),
    TypingShown(IndicatorHandle),
    TypingRemoved(IndicatorHandle),
    History(Vec<String>),
    Welcome(bool),
    Cleared,
}

/// Keeps what a screen would show, plus the raw call log.
#[derive(Default)]
pub struct RecordingSurface {
    pub events: Vec<SurfaceEvent>,
    pub visible: Vec<(Role, String)>,
    pub indicators: Vec<IndicatorHandle>,
    pub history: Vec<SessionSummary>,
    pub welcome: bool,
    next_indicator: u64,
}

impl RenderSurface for RecordingSurface {
    fn append_message(&mut self, role: Role, html: &str) {
        self.visible.push((role, html.to_string()));
        self.events.push(SurfaceEvent::Message(role, html.to_string()));
    }

    fn show_typing_indicator(&mut self) -> IndicatorHandle {
        self.next_indicator += 1;
        let handle = IndicatorHandle(self.next_indicator);
        self.indicators.push(handle);
        self.events.push(SurfaceEvent::TypingShown(handle));
        handle
    }

    fn remove_indicator(&mut self, handle: IndicatorHandle) {
        self.indicators.retain(|existing| *existing != handle);
        self.events.push(SurfaceEvent::TypingRemoved(handle));
    }

    fn render_history(&mut self, sessions: &[SessionSummary]) {
        self.history = sessions.to_vec();
        self.events.push(SurfaceEvent::History(
            sessions.iter().map(|s| s.title.clone()).collect(),
        ));
    }

    fn set_welcome_visible(&mut self, visible: bool) {
        self.welcome = visible;
        self.events.push(SurfaceEvent::Welcome(visible));
    }

    fn clear_messages(&mut self) {
        self.visible.clear();
        self.events.push(SurfaceEvent::Cleared);
    }
}

/// Reads fine, refuses every write, like a store over its quota.
#[derive(Default)]
pub struct FullStore;

impl KeyValueStore for FullStore {
    fn get(&self, _key: &str) -> ChatResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> ChatResult<()> {
        Err(ChatError::Storage("quota exceeded".into()))
    }
}
