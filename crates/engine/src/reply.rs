//! Reply intent classification entry point.
//!
//! Strips quoted history, runs the deterministic keyword classifier, and
//! only escalates to the provider chain when the keyword result is not
//! decisive. The AI path failing is never an error for the caller: the
//! classifier degrades to the keyword result and annotates why.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use leadly_core::{AiSettings, Classification, LeadContext};

use crate::errors::OrchestratorError;
use crate::keyword::{short_circuits, KeywordClassifier};
use crate::orchestrator::Orchestrator;
use crate::prompt::build_classification_prompt;

/// Quote-stripped replies shorter than this fall back to a prefix of the
/// raw text; stripping must never empty the classification input.
const MIN_STRIPPED_LEN: usize = 3;
const RAW_FALLBACK_PREFIX: usize = 500;

/// Reader for the administrator-owned AI settings singleton. Implemented
/// by the host application; read once per classification request.
#[async_trait]
pub trait SettingsReader: Send + Sync {
    async fn ai_settings(&self) -> Option<AiSettings>;
}

pub struct ReplyClassifier {
    settings: Arc<dyn SettingsReader>,
    fallback_settings: AiSettings,
    keyword: KeywordClassifier,
    orchestrator: Orchestrator,
    quote_boundary: QuoteBoundary,
}

impl ReplyClassifier {
    pub fn new(
        settings: Arc<dyn SettingsReader>,
        fallback_settings: AiSettings,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            settings,
            fallback_settings,
            keyword: KeywordClassifier::new(),
            orchestrator,
            quote_boundary: QuoteBoundary::new(),
        }
    }

    /// Classify one reply. Always produces a classification; AI-path
    /// failures degrade to the keyword result.
    pub async fn classify(
        &self,
        lead: &LeadContext,
        raw_reply: &str,
        subject: Option<&str>,
        received_at: Option<DateTime<Utc>>,
    ) -> Classification {
        let correlation_id = Uuid::new_v4();
        info!(
            event_name = "classify.start",
            correlation_id = %correlation_id,
            lead_id = %lead.lead_id,
            received_at = received_at.map(|at| at.to_rfc3339()).unwrap_or_default(),
            "classifying reply"
        );

        let stripped = self.quote_boundary.strip(raw_reply);
        let keyword_result = self.keyword.classify(&stripped);

        if short_circuits(&keyword_result) {
            info!(
                event_name = "classify.short_circuit",
                correlation_id = %correlation_id,
                lead_id = %lead.lead_id,
                confidence = keyword_result.confidence,
                "keyword classifier decisive, skipping ai"
            );
            return keyword_result;
        }

        let settings = self.settings.ai_settings().await.unwrap_or(self.fallback_settings);
        let prompt = build_classification_prompt(&stripped, lead, subject);

        match self.orchestrator.classify(&settings, &prompt).await {
            Ok(classification) => {
                info!(
                    event_name = "classify.ai_result",
                    correlation_id = %correlation_id,
                    lead_id = %lead.lead_id,
                    provider = classification
                        .provider_used
                        .map(|provider| provider.as_str())
                        .unwrap_or("none"),
                    intent = classification.intent_type.as_str(),
                    "ai classification produced"
                );
                classification
            }
            Err(error) => {
                warn!(
                    event_name = "classify.degraded",
                    correlation_id = %correlation_id,
                    lead_id = %lead.lead_id,
                    reason = %error,
                    "ai path unavailable, degrading to keyword result"
                );
                degrade_to_keyword(keyword_result, &error)
            }
        }
    }
}

/// Fail-open: hand back the keyword result, whatever its confidence,
/// with the bypass reason stitched into the primary concern so an
/// operator can see the AI path was skipped.
fn degrade_to_keyword(
    mut keyword_result: Classification,
    error: &OrchestratorError,
) -> Classification {
    let reason = match error {
        OrchestratorError::AiDisabled => "ai disabled".to_string(),
        OrchestratorError::AllProvidersExhausted { attempts } => {
            format!("all providers exhausted after {} attempts", attempts.len())
        }
    };
    keyword_result.primary_concern =
        format!("AI bypassed ({reason}): {}", keyword_result.primary_concern);
    if let OrchestratorError::AllProvidersExhausted { attempts } = error {
        keyword_result.attempts = attempts.clone();
    }
    keyword_result
}

/// Quote-boundary heuristics compiled once.
struct QuoteBoundary {
    attribution: Regex,
    header_like: Regex,
}

impl QuoteBoundary {
    fn new() -> Self {
        Self {
            attribution: Regex::new(r"(?i)^on\s.+wrote:").expect("static pattern compiles"),
            header_like: Regex::new(
                r"(?i)^(from|sent|to|subject):\s|^-{2,}\s*original message\s*-{2,}",
            )
            .expect("static pattern compiles"),
        }
    }

    /// Quoted line or attribution line: dropped, but the scan continues,
    /// because some clients put the new content below the quote.
    fn is_quoted(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        trimmed.starts_with('>') || self.attribution.is_match(trimmed)
    }

    /// Header block: everything from here on is the forwarded original,
    /// typically without quote markers, so the scan stops outright.
    fn is_header_block(&self, line: &str) -> bool {
        self.header_like.is_match(line.trim_start())
    }

    /// Keep only the new (non-quoted) portion of a reply. Falls back to a
    /// fixed-length prefix of the raw text when stripping leaves nothing
    /// usable; classification never fails for lack of input.
    fn strip(&self, raw: &str) -> String {
        let mut retained: Vec<&str> = Vec::new();
        for line in raw.lines() {
            if self.is_header_block(line) {
                break;
            }
            if self.is_quoted(line) {
                continue;
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                retained.push(trimmed);
            }
        }

        let stripped = retained.join(" ");
        if stripped.trim().len() >= MIN_STRIPPED_LEN {
            return stripped.trim().to_string();
        }

        let mut end = raw.len().min(RAW_FALLBACK_PREFIX);
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        raw[..end].trim().to_string()
    }
}
