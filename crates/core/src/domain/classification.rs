use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier for a generative-AI backend.
///
/// The provider set is closed: per-vendor wire shapes are dispatched over
/// this enum rather than over free-form strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Ollama,
}

impl ProviderId {
    /// Fixed declaration order used when expanding fallback slots.
    pub const FALLBACK_ORDER: [ProviderId; 3] =
        [ProviderId::OpenAi, ProviderId::Anthropic, ProviderId::Ollama];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    ReadyToPurchase,
    Negotiating,
    Inquiry,
    NotInterested,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadyToPurchase => "ready_to_purchase",
            Self::Negotiating => "negotiating",
            Self::Inquiry => "inquiry",
            Self::NotInterested => "not_interested",
        }
    }
}

/// Which mechanism produced a classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Keyword,
    Ai,
}

/// Outcome class for a single provider attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    RateLimited,
    HttpError,
    MalformedResponse,
    NotConfigured,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RateLimited => "rate_limited",
            Self::HttpError => "http_error",
            Self::MalformedResponse => "malformed_response",
            Self::NotConfigured => "not_configured",
        }
    }
}

/// One entry in the append-only per-call attempt log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub provider: ProviderId,
    pub attempt_index: u32,
    pub outcome: AttemptOutcome,
    pub error_detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(provider: ProviderId, attempt_index: u32, outcome: AttemptOutcome) -> Self {
        Self { provider, attempt_index, outcome, error_detail: None, at: Utc::now() }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }
}

/// Canonical purchase-intent classification for one reply.
///
/// A value, not an entity: created fresh per request and never mutated
/// after being returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub purchase_intent: bool,
    pub intent_type: IntentType,
    pub primary_concern: String,
    pub suggested_response: String,
    pub confidence: f32,
    pub detected_phrases: Vec<String>,
    pub source: ClassificationSource,
    pub provider_used: Option<ProviderId>,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
}

impl Classification {
    /// The purchase-intent invariant: `purchase_intent` implies
    /// `ready_to_purchase`, and `purchase_intent` never pairs with
    /// `not_interested`.
    pub fn invariant_holds(&self) -> bool {
        if self.purchase_intent {
            self.intent_type == IntentType::ReadyToPurchase
        } else {
            true
        }
    }
}

/// Result of the single inbound operation, `classify_reply`.
///
/// Failure here means the dispatcher's external calls failed, never the
/// classification itself: the engine is fail-open and always produces a
/// classification.
#[derive(Clone, Debug, PartialEq)]
pub enum ClassificationOutcome {
    Classified {
        classification: Classification,
    },
    Failed {
        error: String,
        /// The classification computed before the dispatcher failed, kept
        /// for operator visibility.
        classification: Option<Classification>,
    },
}

impl Serialize for ClassificationOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            Self::Classified { classification } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("classification", classification)?;
                map.end()
            }
            Self::Failed { error, classification } => {
                let len = if classification.is_some() { 3 } else { 2 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                if let Some(classification) = classification {
                    map.serialize_entry("classification", classification)?;
                }
                map.end()
            }
        }
    }
}
