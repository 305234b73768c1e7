use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use leadly_core::config::{AppConfig, LoadOptions};
use toml::Value;

use super::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: 2,
                output: format!("config validation failed: {error}"),
            };
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "ai.enabled",
        &config.ai.settings.enabled.to_string(),
        source("ai.enabled", "LEADLY_AI_ENABLED"),
    ));
    lines.push(render_line(
        "ai.primary_provider",
        config.ai.settings.primary_provider.as_str(),
        source("ai.primary_provider", "LEADLY_AI_PRIMARY_PROVIDER"),
    ));
    lines.push(render_line(
        "ai.fallback_secondary_enabled",
        &config.ai.settings.fallback_secondary_enabled.to_string(),
        source("ai.fallback_secondary_enabled", "LEADLY_AI_FALLBACK_SECONDARY_ENABLED"),
    ));
    lines.push(render_line(
        "ai.fallback_tertiary_enabled",
        &config.ai.settings.fallback_tertiary_enabled.to_string(),
        source("ai.fallback_tertiary_enabled", "LEADLY_AI_FALLBACK_TERTIARY_ENABLED"),
    ));

    let openai_key = if config.ai.openai_api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "ai.openai_api_key",
        openai_key,
        source("ai.openai_api_key", "LEADLY_OPENAI_API_KEY"),
    ));
    let anthropic_key =
        if config.ai.anthropic_api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "ai.anthropic_api_key",
        anthropic_key,
        source("ai.anthropic_api_key", "LEADLY_ANTHROPIC_API_KEY"),
    ));
    lines.push(render_line(
        "ai.ollama_base_url",
        config.ai.ollama_base_url.as_deref().unwrap_or("<unset>"),
        source("ai.ollama_base_url", "LEADLY_OLLAMA_BASE_URL"),
    ));

    lines.push(render_line(
        "ai.request_timeout_secs",
        &config.ai.request_timeout_secs.to_string(),
        source("ai.request_timeout_secs", "LEADLY_AI_REQUEST_TIMEOUT_SECS"),
    ));
    lines.push(render_line(
        "ai.retry.max_attempts",
        &config.ai.retry.max_attempts.to_string(),
        source("ai.retry.max_attempts", "LEADLY_AI_MAX_ATTEMPTS"),
    ));
    lines.push(render_line(
        "ai.retry.base_delay_ms",
        &config.ai.retry.base_delay_ms.to_string(),
        source("ai.retry.base_delay_ms", ""),
    ));
    lines.push(render_line(
        "ai.retry.cap_delay_ms",
        &config.ai.retry.cap_delay_ms.to_string(),
        source("ai.retry.cap_delay_ms", ""),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "LEADLY_LOG_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "LEADLY_LOG_FORMAT"),
    ));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("leadly.toml");
    root.exists().then_some(root)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if !env_key.is_empty() && env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
