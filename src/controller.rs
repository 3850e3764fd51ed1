//! The conversation state machine.
//!
//! A controller is either `Idle` (input accepted) or `Awaiting` (one request in
//! flight). A turn is split in two so a UI can drop its borrow of the
//! controller while the request is outstanding: [`ChatController::begin_turn`]
//! moves to `Awaiting`, [`ChatController::finish_turn`] always returns to `Idle`.

use crate::ai::{LLMBackend, WireMessage, build_request};
use crate::config::service_root;
use crate::error::{ChatError, ChatResult};
use crate::format::format_message;
use crate::session::SessionStore;
use crate::types::{ChatMessage, Role, Session, SessionSummary};
use std::sync::Arc;

const APOLOGY: &str = "Sorry, I encountered an error. ";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndicatorHandle(pub u64);

/// Where the conversation is drawn.
pub trait RenderSurface {
    fn append_message(&mut self, role: Role, html: &str);
    fn show_typing_indicator(&mut self) -> IndicatorHandle;
    fn remove_indicator(&mut self, handle: IndicatorHandle);
    fn render_history(&mut self, sessions: &[SessionSummary]);
    fn set_welcome_visible(&mut self, visible: bool);
    fn clear_messages(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Awaiting,
}

/// A request that has been issued but not answered.
#[derive(Debug)]
pub struct PendingTurn {
    pub request: Vec<WireMessage>,
    pub model: String,
    indicator: IndicatorHandle,
}

#[derive(Debug)]
pub struct TurnOutcome {
    /// The assistant message shown for this turn, a diagnostic when the request failed.
    pub reply: ChatMessage,
    pub error: Option<ChatError>,
    pub save_error: Option<ChatError>,
}

impl TurnOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn saved(&self) -> bool {
        self.save_error.is_none()
    }
}

pub struct ChatController<R: RenderSurface> {
    backend: Arc<dyn LLMBackend>,
    store: SessionStore,
    surface: R,
    model: String,
    transcript: Vec<ChatMessage>,
    session_id: Option<String>,
    state: ControllerState,
}

impl<R: RenderSurface> ChatController<R> {
    pub fn new(
        backend: Arc<dyn LLMBackend>,
        store: SessionStore,
        surface: R,
        model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            store,
            surface,
            model: model.into(),
            transcript: Vec::new(),
            session_id: None,
            state: ControllerState::Idle,
        }
    }

    /// Draws the history list and the empty-chat welcome.
    pub fn initialize(&mut self) {
        self.refresh_history();
        self.surface.set_welcome_visible(self.transcript.is_empty());
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == ControllerState::Awaiting
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Applies to the next request; a request already in flight keeps its model.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn backend(&self) -> Arc<dyn LLMBackend> {
        Arc::clone(&self.backend)
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    /// Records and shows the user's message, then locks input.
    ///
    /// Returns `None` (and changes nothing) for blank text or while a reply is pending.
    pub fn begin_turn(&mut self, text: &str) -> Option<PendingTurn> {
        let text = text.trim();
        if text.is_empty() || self.is_busy() {
            return None;
        }

        let request = build_request(&self.transcript, text);
        self.transcript.push(ChatMessage::user(text));
        self.surface.set_welcome_visible(false);
        self.surface.append_message(Role::User, &format_message(text));
        let indicator = self.surface.show_typing_indicator();
        self.state = ControllerState::Awaiting;

        Some(PendingTurn {
            request,
            model: self.model.clone(),
            indicator,
        })
    }

    /// Shows the reply (or a diagnostic), saves the chat and unlocks input.
    pub fn finish_turn(&mut self, pending: PendingTurn, result: ChatResult<String>) -> TurnOutcome {
        self.surface.remove_indicator(pending.indicator);

        let outcome = match result {
            Ok(text) => {
                let reply = ChatMessage::assistant(text);
                self.surface.append_message(Role::Assistant, &format_message(&reply.content));
                self.transcript.push(reply.clone());
                let save_error = self.persist().err();
                TurnOutcome {
                    reply,
                    error: None,
                    save_error,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat request failed");
                let reply = ChatMessage::assistant(self.diagnostic(&err));
                self.surface.append_message(Role::Assistant, &format_message(&reply.content));
                // The saved chat keeps the user's message but not the diagnostic.
                let save_error = self.persist().err();
                self.transcript.push(reply.clone());
                TurnOutcome {
                    reply,
                    error: Some(err),
                    save_error,
                }
            }
        };

        self.state = ControllerState::Idle;
        outcome
    }

    /// One full turn against the controller's backend.
    pub async fn submit(&mut self, text: &str) -> Option<TurnOutcome> {
        let pending = self.begin_turn(text)?;
        let backend = self.backend();
        let result = backend.complete(&pending.request, &pending.model).await;
        Some(self.finish_turn(pending, result))
    }

    /// Clears the conversation so the next save creates a new session.
    ///
    /// Ignored (returns `false`) while a reply is pending.
    pub fn start_new_chat(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.transcript.clear();
        self.session_id = None;
        self.surface.clear_messages();
        self.surface.set_welcome_visible(true);
        self.refresh_history();
        tracing::info!("started a new chat");
        true
    }

    /// Replaces the conversation with a saved session.
    ///
    /// `Ok(false)` means the call was ignored because a reply is pending.
    pub fn load_chat(&mut self, id: &str) -> ChatResult<bool> {
        if self.is_busy() {
            return Ok(false);
        }
        let session = self.store.load_session(id)?;

        self.surface.clear_messages();
        self.surface.set_welcome_visible(false);
        for msg in &session.messages {
            self.surface.append_message(msg.role, &format_message(&msg.content));
        }
        self.transcript = session.messages;
        self.session_id = session.id;
        self.model = session.model;
        Ok(true)
    }

    /// The text shown in place of a reply when a turn fails.
    pub fn diagnostic(&self, err: &ChatError) -> String {
        let detail = if err.is_network() {
            format!(
                "Please make sure Ollama is running on {}",
                service_root(self.backend.endpoint())
            )
        } else {
            let message = err.to_string();
            if message.is_empty() {
                "Please try again.".to_string()
            } else {
                message
            }
        };
        format!("{APOLOGY}{detail}")
    }

    fn persist(&mut self) -> ChatResult<()> {
        if self.transcript.is_empty() {
            return Ok(());
        }
        let mut session = Session::new(self.model.clone(), self.transcript.clone());
        session.id = self.session_id.clone();

        match self.store.save(&mut session) {
            Ok(id) => {
                self.session_id = Some(id);
                self.refresh_history();
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat was not saved");
                Err(err)
            }
        }
    }

    fn refresh_history(&mut self) {
        match self.store.load_index() {
            Ok(index) => self.surface.render_history(&index),
            Err(err) => tracing::warn!(error = %err, "could not read chat history"),
        }
    }
}
