//! Provider fallback chain.
//!
//! One classification call walks an ordered, de-duplicated provider chain
//! built from the administrator's AI settings. The walk is a small state
//! machine: each provider either gets skipped (no credential), succeeds,
//! or exhausts its retry budget and hands the chain to the next provider.
//! Providers are tried strictly sequentially; speculative concurrent
//! calls would multiply cost and blur which result wins.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use leadly_core::{
    AiConfig, AiSettings, AttemptOutcome, AttemptRecord, Classification, ClassificationSource,
    ProviderId,
};

use crate::errors::OrchestratorError;
use crate::normalize::AiReply;
use crate::providers::ProviderConfig;
use crate::retry::RetryController;
use crate::transport::ProviderTransport;

/// Per-provider step outcome inside the chain walk.
enum ProviderVerdict {
    Skipped,
    Succeeded(AiReply),
    Exhausted,
}

pub struct Orchestrator {
    config: AiConfig,
    transport: Arc<dyn ProviderTransport>,
    retry: RetryController,
}

impl Orchestrator {
    pub fn new(config: AiConfig, transport: Arc<dyn ProviderTransport>) -> Self {
        let retry = RetryController::new(config.retry);
        Self { config, transport, retry }
    }

    /// Drive the prompt through the fallback chain and return the first
    /// success with provenance. Settings are read by the caller per
    /// request; `enabled == false` is a hard kill switch checked before
    /// any network activity.
    pub async fn classify(
        &self,
        settings: &AiSettings,
        prompt: &str,
    ) -> Result<Classification, OrchestratorError> {
        if !settings.enabled {
            info!(event_name = "ai.orchestrator.disabled", "ai path disabled by settings");
            return Err(OrchestratorError::AiDisabled);
        }

        let chain = model_priority(settings);
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut any_provider_attempted = false;

        for provider_id in chain {
            let verdict = self
                .try_provider(provider_id, prompt, &mut attempts, any_provider_attempted)
                .await;

            match verdict {
                ProviderVerdict::Skipped => {}
                ProviderVerdict::Exhausted => any_provider_attempted = true,
                ProviderVerdict::Succeeded(reply) => {
                    info!(
                        event_name = "ai.orchestrator.success",
                        provider = %provider_id,
                        total_attempts = attempts.len(),
                        "classification produced by provider chain"
                    );
                    return Ok(classification_from(reply, provider_id, attempts));
                }
            }
        }

        warn!(
            event_name = "ai.orchestrator.exhausted",
            total_attempts = attempts.len(),
            "every provider skipped or exhausted"
        );
        Err(OrchestratorError::AllProvidersExhausted { attempts })
    }

    async fn try_provider(
        &self,
        provider_id: ProviderId,
        prompt: &str,
        attempts: &mut Vec<AttemptRecord>,
        any_provider_attempted: bool,
    ) -> ProviderVerdict {
        let provider = ProviderConfig::resolve(provider_id, &self.config);
        if !provider.is_configured() {
            attempts.push(
                AttemptRecord::new(provider_id, 0, AttemptOutcome::NotConfigured)
                    .with_detail("credential absent"),
            );
            info!(
                event_name = "ai.provider.attempt",
                provider = %provider_id,
                attempt = 0u32,
                outcome = AttemptOutcome::NotConfigured.as_str(),
                "provider skipped"
            );
            return ProviderVerdict::Skipped;
        }

        // Providers often share upstream quota pools; a cooldown between
        // chain hops keeps one provider's rate limit from cascading into
        // the next provider's first attempt.
        if any_provider_attempted {
            let cooldown = Duration::from_millis(self.config.retry.provider_cooldown_ms);
            if !cooldown.is_zero() {
                info!(
                    event_name = "ai.orchestrator.cooldown",
                    provider = %provider_id,
                    cooldown_ms = self.config.retry.provider_cooldown_ms,
                    "cooling down before next provider"
                );
                tokio::time::sleep(cooldown).await;
            }
        }

        match self.retry.call_provider(self.transport.as_ref(), &provider, prompt, attempts).await
        {
            Ok(reply) => ProviderVerdict::Succeeded(reply),
            Err(exhausted) => {
                warn!(
                    event_name = "ai.provider.exhausted",
                    provider = %provider_id,
                    attempts_made = exhausted.attempts_made,
                    error = %exhausted.last_error,
                    "provider exhausted, advancing chain"
                );
                ProviderVerdict::Exhausted
            }
        }
    }
}

/// Build the ordered provider chain for one call: primary first, then
/// enabled fallback slots drawn from the fixed declaration order, with
/// the primary de-duplicated out of the fallback candidates.
pub fn model_priority(settings: &AiSettings) -> Vec<ProviderId> {
    let mut chain = vec![settings.primary_provider];

    let fallbacks: Vec<ProviderId> = ProviderId::FALLBACK_ORDER
        .into_iter()
        .filter(|candidate| *candidate != settings.primary_provider)
        .collect();

    if settings.fallback_secondary_enabled {
        if let Some(secondary) = fallbacks.first() {
            chain.push(*secondary);
        }
    }
    if settings.fallback_tertiary_enabled {
        if let Some(tertiary) = fallbacks.get(1) {
            chain.push(*tertiary);
        }
    }

    chain
}

fn classification_from(
    reply: AiReply,
    provider_used: ProviderId,
    attempts: Vec<AttemptRecord>,
) -> Classification {
    Classification {
        purchase_intent: reply.purchase_intent,
        intent_type: reply.intent_type,
        primary_concern: reply.primary_concern,
        suggested_response: reply.suggested_response,
        confidence: reply.confidence,
        detected_phrases: reply.detected_phrases,
        source: ClassificationSource::Ai,
        provider_used: Some(provider_used),
        attempts,
    }
}
