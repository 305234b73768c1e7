pub mod config;
pub mod domain;
pub mod errors;

pub use config::{
    AiConfig, AiSettings, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat,
    LoggingConfig, RetryConfig,
};
pub use domain::classification::{
    AttemptOutcome, AttemptRecord, Classification, ClassificationOutcome, ClassificationSource,
    IntentType, ProviderId,
};
pub use domain::lead::{LeadContext, LeadId, LeadStatus};
pub use errors::DomainError;
