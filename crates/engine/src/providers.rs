//! Provider registry and per-vendor wire codecs.
//!
//! The provider set is closed, so each vendor's request/response shape is
//! one arm of a match over `ProviderId`: one `build_request` encoder and
//! one `extract_text` decoder per variant, behind a single interface.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use leadly_core::{AiConfig, ProviderId};

use crate::errors::ParseFailure;
use crate::transport::ProviderRequest;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_RESPONSE_TOKENS: u32 = 512;

/// Static catalog entry: who the provider is and which model it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: ProviderId,
    pub model_id: &'static str,
    pub display_name: &'static str,
}

pub const CATALOG: [CatalogEntry; 3] = [
    CatalogEntry { id: ProviderId::OpenAi, model_id: "gpt-4o-mini", display_name: "OpenAI" },
    CatalogEntry {
        id: ProviderId::Anthropic,
        model_id: "claude-3-5-haiku-latest",
        display_name: "Anthropic",
    },
    CatalogEntry { id: ProviderId::Ollama, model_id: "llama3.1", display_name: "Ollama" },
];

pub fn catalog_entry(id: ProviderId) -> CatalogEntry {
    CATALOG.iter().copied().find(|entry| entry.id == id).expect("catalog covers every provider")
}

/// A provider resolved for one call: catalog entry plus whatever
/// credential material the configuration holds right now.
#[derive(Clone)]
pub struct ProviderConfig {
    pub entry: CatalogEntry,
    credential: Credential,
}

#[derive(Clone)]
enum Credential {
    ApiKey(SecretString),
    BaseUrl(String),
    Absent,
}

impl ProviderConfig {
    /// Resolve a provider against the AI configuration. An unusable
    /// provider still resolves; `is_configured` reports whether it can be
    /// called.
    pub fn resolve(id: ProviderId, config: &AiConfig) -> Self {
        let credential = match id {
            ProviderId::OpenAi => {
                config.openai_api_key.clone().map(Credential::ApiKey).unwrap_or(Credential::Absent)
            }
            ProviderId::Anthropic => config
                .anthropic_api_key
                .clone()
                .map(Credential::ApiKey)
                .unwrap_or(Credential::Absent),
            // Ollama is keyless; a configured base URL is its credential.
            ProviderId::Ollama => config
                .ollama_base_url
                .clone()
                .map(Credential::BaseUrl)
                .unwrap_or(Credential::Absent),
        };
        Self { entry: catalog_entry(id), credential }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self.credential, Credential::Absent)
    }

    /// Encode the classification prompt into this vendor's request shape.
    pub fn build_request(&self, prompt: &str) -> ProviderRequest {
        let model = self.entry.model_id;
        match self.entry.id {
            ProviderId::OpenAi => ProviderRequest {
                provider: self.entry.id,
                url: OPENAI_ENDPOINT.to_string(),
                headers: vec![("Authorization".to_string(), self.bearer_header())],
                body: json!({
                    "model": model,
                    "messages": [{"role": "user", "content": prompt}],
                    "temperature": 0.2,
                    "max_tokens": MAX_RESPONSE_TOKENS,
                }),
            },
            ProviderId::Anthropic => ProviderRequest {
                provider: self.entry.id,
                url: ANTHROPIC_ENDPOINT.to_string(),
                headers: vec![
                    ("x-api-key".to_string(), self.raw_key()),
                    ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
                ],
                body: json!({
                    "model": model,
                    "max_tokens": MAX_RESPONSE_TOKENS,
                    "messages": [{"role": "user", "content": prompt}],
                }),
            },
            ProviderId::Ollama => ProviderRequest {
                provider: self.entry.id,
                url: format!("{}/api/chat", self.base_url().trim_end_matches('/')),
                headers: Vec::new(),
                body: json!({
                    "model": model,
                    "messages": [{"role": "user", "content": prompt}],
                    "stream": false,
                }),
            },
        }
    }

    fn bearer_header(&self) -> String {
        format!("Bearer {}", self.raw_key())
    }

    fn raw_key(&self) -> String {
        match &self.credential {
            Credential::ApiKey(key) => key.expose_secret().to_string(),
            _ => String::new(),
        }
    }

    fn base_url(&self) -> &str {
        match &self.credential {
            Credential::BaseUrl(url) => url,
            _ => "",
        }
    }
}

/// Decode the assistant text out of this vendor's response shape.
pub fn extract_text(provider: ProviderId, body: &str) -> Result<String, ParseFailure> {
    let value: Value =
        serde_json::from_str(body).map_err(|error| ParseFailure::BadShape(error.to_string()))?;

    let text = match provider {
        ProviderId::OpenAi => value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string),
        ProviderId::Anthropic => {
            value.pointer("/content/0/text").and_then(Value::as_str).map(str::to_string)
        }
        ProviderId::Ollama => {
            value.pointer("/message/content").and_then(Value::as_str).map(str::to_string)
        }
    };

    text.filter(|content| !content.trim().is_empty()).ok_or(ParseFailure::MissingText)
}
