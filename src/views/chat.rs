use crate::controller::{ChatController, IndicatorHandle, RenderSurface};
use crate::error::ChatResult;
use crate::types::{Role, SessionSummary};
use crate::ui::ChatServices;
use dioxus::events::Key;
use dioxus::prelude::*;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

const HISTORY_TIME_FORMAT: &[FormatItem<'static>] = format_description!(
    "[month repr:short] [day padding:none], [hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]"
);

fn format_history_timestamp(timestamp: OffsetDateTime) -> Option<String> {
    let mut datetime = timestamp;
    if let Ok(offset) = UtcOffset::current_local_offset() {
        datetime = datetime.to_offset(offset);
    }
    datetime.format(HISTORY_TIME_FORMAT).ok()
}

/// A loaded chat clears the notice, a failed load replaces it, an ignored one keeps it.
fn notice_after_load(loaded: &ChatResult<bool>, current: Option<String>) -> Option<String> {
    match loaded {
        Ok(true) => None,
        Ok(false) => current,
        Err(err) => Some(err.to_string()),
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Bubble {
    id: u64,
    role: Role,
    html: String,
    typing: bool,
}

/// Signals the chat view renders from; the controller writes through these.
pub struct ViewSurface {
    bubbles: Signal<Vec<Bubble>>,
    history: Signal<Vec<SessionSummary>>,
    welcome: Signal<bool>,
    next_id: u64,
}

impl ViewSurface {
    fn push(&mut self, role: Role, html: String, typing: bool) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.bubbles.with_mut(|bubbles| {
            bubbles.push(Bubble {
                id,
                role,
                html,
                typing,
            })
        });
        id
    }
}

impl RenderSurface for ViewSurface {
    fn append_message(&mut self, role: Role, html: &str) {
        self.push(role, html.to_string(), false);
    }

    fn show_typing_indicator(&mut self) -> IndicatorHandle {
        IndicatorHandle(self.push(Role::Assistant, String::new(), true))
    }

    fn remove_indicator(&mut self, handle: IndicatorHandle) {
        self.bubbles
            .with_mut(|bubbles| bubbles.retain(|bubble| bubble.id != handle.0));
    }

    fn render_history(&mut self, sessions: &[SessionSummary]) {
        self.history.set(sessions.to_vec());
    }

    fn set_welcome_visible(&mut self, visible: bool) {
        self.welcome.set(visible);
    }

    fn clear_messages(&mut self) {
        self.bubbles.set(Vec::new());
    }
}

#[component]
pub fn ChatView(services: ChatServices) -> Element {
    let bubbles = use_signal(Vec::<Bubble>::new);
    let history = use_signal(Vec::<SessionSummary>::new);
    let welcome = use_signal(|| true);
    let mut input = use_signal(String::new);
    let mut notice = use_signal(|| Option::<String>::None);
    let models = services.config.models.clone();

    let mut controller = use_signal(|| {
        let surface = ViewSurface {
            bubbles,
            history,
            welcome,
            next_id: 1,
        };
        ChatController::new(
            services.backend.clone(),
            services.store.clone(),
            surface,
            services.config.model.clone(),
        )
    });

    use_effect(move || {
        controller.write().initialize();
    });

    let mut send_message = move |text: String| {
        let Some(pending) = controller.write().begin_turn(&text) else {
            return;
        };
        input.set(String::new());
        let backend = controller.read().backend();
        spawn(async move {
            let result = backend.complete(&pending.request, &pending.model).await;
            let outcome = controller.write().finish_turn(pending, result);
            match outcome.save_error {
                Some(err) => notice.set(Some(format!("This chat was not saved: {err}"))),
                None => notice.set(None),
            }
        });
    };

    let busy = controller.read().is_busy();
    let model = controller.read().model().to_string();
    let bubbles_snapshot = bubbles();
    let history_snapshot = history();

    rsx! {
        div { class: "app",
            aside { class: "sidebar",
                button {
                    class: "btn btn-primary new-chat",
                    r#type: "button",
                    disabled: busy,
                    onclick: move |_| {
                        if controller.write().start_new_chat() {
                            input.set(String::new());
                            notice.set(None);
                        }
                    },
                    "New Chat"
                }
                div { class: "history-list",
                    for summary in history_snapshot {
                        HistoryItem {
                            key: "{summary.id}",
                            summary: summary.clone(),
                            disabled: busy,
                            on_select: move |id: String| {
                                let loaded = controller.write().load_chat(&id);
                                notice.set(notice_after_load(&loaded, notice()));
                            },
                        }
                    }
                }
            }
            main { class: "chat-main",
                div { class: "chat-header",
                    span { class: "current-model", "{model}" }
                    select {
                        class: "model-select",
                        value: "{model}",
                        disabled: busy,
                        onchange: move |ev| controller.write().set_model(ev.value()),
                        for name in models.iter() {
                            option { value: "{name}", selected: *name == model, "{name}" }
                        }
                    }
                }
                if welcome() {
                    div { class: "welcome-screen",
                        h2 { "Chat with a local model" }
                        p { class: "text-muted", "Messages go to {services.config.endpoint} using {model}." }
                    }
                }
                div { id: "chat-container", class: "chat-container",
                    for bubble in bubbles_snapshot {
                        MessageBubble { key: "{bubble.id}", bubble: bubble.clone() }
                    }
                }
                if let Some(text) = notice() {
                    div { class: "notice", "{text}" }
                }
                form { class: "composer",
                    textarea {
                        rows: "1",
                        placeholder: "Type your message...",
                        value: "{input}",
                        disabled: busy,
                        autofocus: true,
                        oninput: move |ev| input.set(ev.value()),
                        onkeydown: move |ev| {
                            if ev.key() == Key::Enter && !ev.modifiers().shift() {
                                ev.prevent_default();
                                send_message(input());
                            }
                        },
                    }
                    button {
                        class: "btn btn-primary",
                        r#type: "button",
                        disabled: busy || input().trim().is_empty(),
                        onclick: move |_| send_message(input()),
                        "Send"
                    }
                }
            }
        }
    }
}

#[component]
fn MessageBubble(bubble: Bubble) -> Element {
    let role_class = bubble.role.as_str();
    let avatar = match bubble.role {
        Role::User => "U",
        Role::Assistant => "AI",
    };
    rsx! {
        div { class: "message {role_class}",
            div { class: "message-avatar", "{avatar}" }
            div { class: "message-content",
                if bubble.typing {
                    div { class: "typing-indicator",
                        div { class: "typing-dot" }
                        div { class: "typing-dot" }
                        div { class: "typing-dot" }
                    }
                } else {
                    div { dangerous_inner_html: "{bubble.html}" }
                }
            }
        }
    }
}

#[component]
fn HistoryItem(summary: SessionSummary, disabled: bool, on_select: EventHandler<String>) -> Element {
    let when = format_history_timestamp(summary.timestamp).unwrap_or_default();
    let id = summary.id.clone();
    rsx! {
        button {
            class: "history-item",
            r#type: "button",
            title: "{summary.title}",
            disabled: disabled,
            onclick: move |_| on_select.call(id.clone()),
            span { class: "history-title", "{summary.title}" }
            span { class: "history-meta", "{summary.model} · {when}" }
        }
    }
}
