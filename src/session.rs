//! Saved chat sessions.
//!
//! The whole history lives in a single record (`chats`) holding a JSON array
//! of sessions. Every save reads the array, upserts by id and writes the
//! array back. Nothing guards that read-modify-write: two writers sharing the
//! same store can interleave and one update is lost.

use crate::error::{ChatError, ChatResult};
use crate::storage::KeyValueStore;
use crate::types::{ChatMessage, Session, SessionSummary};
use std::sync::Arc;
use time::OffsetDateTime;

pub const SESSIONS_KEY: &str = "chats";
pub const HISTORY_LIMIT: usize = 10;
pub const TITLE_MAX_CHARS: usize = 50;
pub const UNTITLED: &str = "New Chat";

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Every stored session, in storage order.
    ///
    /// A missing record is an empty history. So is a record that is not a JSON
    /// array. Individual entries that don't read as a session are skipped and
    /// the rest are kept; both cases are logged rather than surfaced.
    pub fn load_all(&self) -> ChatResult<Vec<Session>> {
        let Some(raw) = self.backend.get(SESSIONS_KEY)? else {
            return Ok(Vec::new());
        };
        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "saved chats are unreadable, starting from an empty history");
                return Ok(Vec::new());
            }
        };
        Ok(entries
            .into_iter()
            .enumerate()
            .filter_map(|(position, entry)| match serde_json::from_value::<Session>(entry) {
                Ok(session) => Some(session),
                Err(err) => {
                    tracing::warn!(position, error = %err, "skipping unreadable saved chat");
                    None
                }
            })
            .collect())
    }

    pub fn write_all(&self, sessions: &[Session]) -> ChatResult<()> {
        let encoded = serde_json::to_string(sessions)?;
        self.backend.set(SESSIONS_KEY, &encoded)
    }

    /// Upserts `session` and returns its id, assigning one on first save.
    ///
    /// The stored record always mirrors the full message list passed in.
    pub fn save(&self, session: &mut Session) -> ChatResult<String> {
        let mut sessions = self.load_all()?;
        let now = OffsetDateTime::now_utc();

        let id = match &session.id {
            Some(id) => id.clone(),
            None => fresh_id(now, &sessions),
        };
        session.id = Some(id.clone());
        session.timestamp = now;
        session.title = derive_title(&session.messages);

        match sessions
            .iter_mut()
            .find(|existing| existing.id.as_deref() == Some(id.as_str()))
        {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }

        self.write_all(&sessions)?;
        tracing::info!(session = %id, messages = session.messages.len(), "saved chat");
        Ok(id)
    }

    /// Most recent sessions first, at most [`HISTORY_LIMIT`].
    pub fn load_index(&self) -> ChatResult<Vec<SessionSummary>> {
        let mut sessions = self.load_all()?;
        sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(sessions
            .iter()
            .filter_map(Session::summary)
            .take(HISTORY_LIMIT)
            .collect())
    }

    pub fn load_session(&self, id: &str) -> ChatResult<Session> {
        self.load_all()?
            .into_iter()
            .find(|session| session.id.as_deref() == Some(id))
            .ok_or_else(|| ChatError::UnknownSession(id.to_string()))
    }
}

/// First message's leading characters, or "New Chat".
pub fn derive_title(messages: &[ChatMessage]) -> String {
    match messages.first() {
        Some(first) if !first.content.is_empty() => {
            first.content.chars().take(TITLE_MAX_CHARS).collect()
        }
        _ => UNTITLED.to_string(),
    }
}

fn fresh_id(now: OffsetDateTime, sessions: &[Session]) -> String {
    let mut millis = now.unix_timestamp_nanos() / 1_000_000;
    loop {
        let candidate = millis.to_string();
        if !sessions
            .iter()
            .any(|session| session.id.as_deref() == Some(candidate.as_str()))
        {
            return candidate;
        }
        millis += 1;
    }
}
