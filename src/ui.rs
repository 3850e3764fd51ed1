use crate::ai::{LLMBackend, OllamaBackend};
use crate::config::ChatConfig;
use crate::session::SessionStore;
use crate::storage::FileStore;
use crate::views::ChatView;
use dioxus::prelude::*;
use std::sync::Arc;

const CHAT_CSS: Asset = asset!("/assets/chat.css");
const STORE_SCOPE: &str = "default";

/// Everything the chat view needs from the outside world.
#[derive(Clone)]
pub struct ChatServices {
    pub config: ChatConfig,
    pub backend: Arc<dyn LLMBackend>,
    pub store: SessionStore,
}

impl ChatServices {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = ChatConfig::from_env()?;
        let backend = Arc::new(OllamaBackend::new(&config)?);
        let store = SessionStore::new(Arc::new(FileStore::new(&config.data_dir, STORE_SCOPE)));
        tracing::info!(endpoint = %config.endpoint, model = %config.model, data_dir = %config.data_dir.display(), "chat services ready");
        Ok(Self {
            config,
            backend,
            store,
        })
    }
}

impl PartialEq for ChatServices {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && Arc::ptr_eq(&self.backend, &other.backend)
    }
}

#[component]
pub fn App() -> Element {
    let services = use_hook(|| ChatServices::from_env().map_err(|err| format!("{err:#}")));

    let body = match services {
        Ok(services) => rsx! { ChatView { services } },
        Err(message) => rsx! { SetupError { message } },
    };

    rsx! {
        document::Link { rel: "stylesheet", href: CHAT_CSS }
        {body}
    }
}

#[component]
fn SetupError(message: String) -> Element {
    rsx! {
        div { class: "setup-error",
            h2 { "localchat could not start" }
            p { "{message}" }
            p { class: "text-muted", "Check OLLAMA_ENDPOINT, LLM_MODEL, LLM_TIMEOUT_SECS and LOCALCHAT_DATA_DIR." }
        }
    }
}
