use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::classification::ProviderId;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ai: AiConfig,
    pub logging: LoggingConfig,
}

/// Administrator-owned toggles for the AI path.
///
/// Read once per classification request through a `SettingsReader`; the
/// engine never caches these across requests because an administrator may
/// flip them between calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AiSettings {
    pub enabled: bool,
    pub primary_provider: ProviderId,
    pub fallback_secondary_enabled: bool,
    pub fallback_tertiary_enabled: bool,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            primary_provider: ProviderId::OpenAi,
            fallback_secondary_enabled: true,
            fallback_tertiary_enabled: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub settings: AiSettings,
    pub openai_api_key: Option<SecretString>,
    pub anthropic_api_key: Option<SecretString>,
    pub ollama_base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
}

/// Backoff shape for a single provider's attempt loop, plus the
/// inter-provider cooldown the orchestrator applies between chain hops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub growth_factor: f64,
    pub cap_delay_ms: u64,
    pub jitter_ms: u64,
    pub provider_cooldown_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            growth_factor: 2.0,
            cap_delay_ms: 8_000,
            jitter_ms: 250,
            provider_cooldown_ms: 1_000,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub ai_enabled: Option<bool>,
    pub primary_provider: Option<ProviderId>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai: AiConfig {
                settings: AiSettings::default(),
                openai_api_key: None,
                anthropic_api_key: None,
                ollama_base_url: Some("http://localhost:11434".to_string()),
                request_timeout_secs: 30,
                retry: RetryConfig::default(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for ProviderId {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProviderId::parse(value).ok_or_else(|| {
            ConfigError::Validation(format!(
                "unsupported ai provider `{value}` (expected openai|anthropic|ollama)"
            ))
        })
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    ai: Option<AiPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AiPatch {
    enabled: Option<bool>,
    primary_provider: Option<String>,
    fallback_secondary_enabled: Option<bool>,
    fallback_tertiary_enabled: Option<bool>,
    openai_api_key: Option<String>,
    anthropic_api_key: Option<String>,
    ollama_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    retry: Option<RetryPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RetryPatch {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    growth_factor: Option<f64>,
    cap_delay_ms: Option<u64>,
    jitter_ms: Option<u64>,
    provider_cooldown_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("leadly.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(ai) = patch.ai {
            if let Some(enabled) = ai.enabled {
                self.ai.settings.enabled = enabled;
            }
            if let Some(primary) = ai.primary_provider {
                self.ai.settings.primary_provider = primary.parse()?;
            }
            if let Some(secondary) = ai.fallback_secondary_enabled {
                self.ai.settings.fallback_secondary_enabled = secondary;
            }
            if let Some(tertiary) = ai.fallback_tertiary_enabled {
                self.ai.settings.fallback_tertiary_enabled = tertiary;
            }
            if let Some(openai_key_value) = ai.openai_api_key {
                self.ai.openai_api_key = Some(openai_key_value.into());
            }
            if let Some(anthropic_key_value) = ai.anthropic_api_key {
                self.ai.anthropic_api_key = Some(anthropic_key_value.into());
            }
            if let Some(base_url) = ai.ollama_base_url {
                self.ai.ollama_base_url = Some(base_url);
            }
            if let Some(timeout_secs) = ai.request_timeout_secs {
                self.ai.request_timeout_secs = timeout_secs;
            }
            if let Some(retry) = ai.retry {
                if let Some(max_attempts) = retry.max_attempts {
                    self.ai.retry.max_attempts = max_attempts;
                }
                if let Some(base_delay_ms) = retry.base_delay_ms {
                    self.ai.retry.base_delay_ms = base_delay_ms;
                }
                if let Some(growth_factor) = retry.growth_factor {
                    self.ai.retry.growth_factor = growth_factor;
                }
                if let Some(cap_delay_ms) = retry.cap_delay_ms {
                    self.ai.retry.cap_delay_ms = cap_delay_ms;
                }
                if let Some(jitter_ms) = retry.jitter_ms {
                    self.ai.retry.jitter_ms = jitter_ms;
                }
                if let Some(cooldown_ms) = retry.provider_cooldown_ms {
                    self.ai.retry.provider_cooldown_ms = cooldown_ms;
                }
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LEADLY_AI_ENABLED") {
            self.ai.settings.enabled = parse_bool("LEADLY_AI_ENABLED", &value)?;
        }
        if let Some(value) = read_env("LEADLY_AI_PRIMARY_PROVIDER") {
            self.ai.settings.primary_provider = value.parse()?;
        }
        if let Some(value) = read_env("LEADLY_AI_FALLBACK_SECONDARY_ENABLED") {
            self.ai.settings.fallback_secondary_enabled =
                parse_bool("LEADLY_AI_FALLBACK_SECONDARY_ENABLED", &value)?;
        }
        if let Some(value) = read_env("LEADLY_AI_FALLBACK_TERTIARY_ENABLED") {
            self.ai.settings.fallback_tertiary_enabled =
                parse_bool("LEADLY_AI_FALLBACK_TERTIARY_ENABLED", &value)?;
        }
        if let Some(openai_key_value) = read_env("LEADLY_OPENAI_API_KEY") {
            self.ai.openai_api_key = Some(openai_key_value.into());
        }
        if let Some(anthropic_key_value) = read_env("LEADLY_ANTHROPIC_API_KEY") {
            self.ai.anthropic_api_key = Some(anthropic_key_value.into());
        }
        if let Some(value) = read_env("LEADLY_OLLAMA_BASE_URL") {
            self.ai.ollama_base_url = Some(value);
        }
        if let Some(value) = read_env("LEADLY_AI_REQUEST_TIMEOUT_SECS") {
            self.ai.request_timeout_secs =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "LEADLY_AI_REQUEST_TIMEOUT_SECS".to_string(),
                    value,
                })?;
        }
        if let Some(value) = read_env("LEADLY_AI_MAX_ATTEMPTS") {
            self.ai.retry.max_attempts =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "LEADLY_AI_MAX_ATTEMPTS".to_string(),
                    value,
                })?;
        }
        if let Some(value) = read_env("LEADLY_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("LEADLY_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(enabled) = overrides.ai_enabled {
            self.ai.settings.enabled = enabled;
        }
        if let Some(primary) = overrides.primary_provider {
            self.ai.settings.primary_provider = primary;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.retry.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "ai.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.ai.retry.growth_factor < 1.0 {
            return Err(ConfigError::Validation(
                "ai.retry.growth_factor must be >= 1.0".to_string(),
            ));
        }
        if self.ai.retry.cap_delay_ms < self.ai.retry.base_delay_ms {
            return Err(ConfigError::Validation(
                "ai.retry.cap_delay_ms must be >= ai.retry.base_delay_ms".to_string(),
            ));
        }
        if self.ai.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "ai.request_timeout_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }),
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    let default = PathBuf::from("leadly.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::domain::classification::ProviderId;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_enable_ai_with_openai_primary() {
        let config = AppConfig::default();
        assert!(config.ai.settings.enabled);
        assert_eq!(config.ai.settings.primary_provider, ProviderId::OpenAi);
        assert!(config.ai.settings.fallback_secondary_enabled);
        assert!(!config.ai.settings.fallback_tertiary_enabled);
        assert_eq!(config.ai.retry.max_attempts, 3);
    }

    #[test]
    fn toml_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[ai]\nprimary_provider = \"anthropic\"\nfallback_tertiary_enabled = true\n\n\
             [ai.retry]\nmax_attempts = 5\n\n[logging]\nlevel = \"debug\"\nformat = \"json\""
        )
        .unwrap();

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .unwrap();

        assert_eq!(config.ai.settings.primary_provider, ProviderId::Anthropic);
        assert!(config.ai.settings.fallback_tertiary_enabled);
        assert_eq!(config.ai.retry.max_attempts, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("no-such-leadly.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn programmatic_overrides_win() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some("no-such-leadly.toml".into()),
            require_file: false,
            overrides: ConfigOverrides {
                ai_enabled: Some(false),
                primary_provider: Some(ProviderId::Ollama),
                log_level: Some("trace".to_string()),
            },
        })
        .unwrap();

        assert!(!config.ai.settings.enabled);
        assert_eq!(config.ai.settings.primary_provider, ProviderId::Ollama);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn zero_max_attempts_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ai.retry]\nmax_attempts = 0").unwrap();

        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unknown_provider_in_patch_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ai]\nprimary_provider = \"gemini\"").unwrap();

        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
