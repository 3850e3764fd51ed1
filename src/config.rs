//! Runtime configuration, read from the environment (and `.env` when present).

use anyhow::{Context, Result, bail};
use reqwest::Url;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/chat";
pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug, PartialEq)]
pub struct ChatConfig {
    pub endpoint: String,
    pub model: String,
    pub models: Vec<String>,
    /// `None` leaves the transport default in place.
    pub request_timeout: Option<Duration>,
    pub data_dir: PathBuf,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            models: vec![DEFAULT_MODEL.to_string()],
            request_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            data_dir: default_data_dir(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let endpoint = read("OLLAMA_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let url = Url::parse(&endpoint).with_context(|| format!("invalid OLLAMA_ENDPOINT {endpoint:?}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("OLLAMA_ENDPOINT must be an http(s) URL, got {endpoint:?}");
        }

        let model = read("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let mut models: Vec<String> = read("LLM_MODELS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if !models.contains(&model) {
            models.insert(0, model.clone());
        }

        let request_timeout = match read("LLM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("LLM_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        };

        let data_dir = read("LOCALCHAT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Ok(Self {
            endpoint,
            model,
            models,
            request_timeout,
            data_dir,
        })
    }

    /// `scheme://host[:port]` of the endpoint, for "is the server running" hints.
    pub fn service_root(&self) -> String {
        service_root(&self.endpoint)
    }
}

pub fn service_root(endpoint: &str) -> String {
    match Url::parse(endpoint) {
        Ok(url) => url.origin().ascii_serialization(),
        Err(_) => endpoint.to_string(),
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("localchat");
    }

    PathBuf::from("cache").join("localchat")
}
