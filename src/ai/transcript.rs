use crate::types::ChatMessage;
use serde::Serialize;

/// A message as the endpoint expects it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: msg.content.clone(),
        }
    }
}

/// History (as `user`/`assistant` pairs) followed by the pending user text.
///
/// `history` must not already contain the pending message.
pub fn build_request(history: &[ChatMessage], pending: &str) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.extend(history.iter().map(WireMessage::from));
    messages.push(WireMessage {
        role: "user",
        content: pending.to_string(),
    });
    messages
}
