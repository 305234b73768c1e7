//! Per-provider attempt loop: bounded retries, exponential backoff with a
//! cap, and random jitter so concurrent classification flows do not retry
//! in lockstep.

use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use leadly_core::{AttemptOutcome, AttemptRecord, RetryConfig};

use crate::errors::{ProviderCallError, ProviderExhausted};
use crate::normalize::{parse_ai_reply, AiReply};
use crate::providers::{extract_text, ProviderConfig};
use crate::transport::ProviderTransport;

pub struct RetryController {
    policy: RetryConfig,
}

impl RetryController {
    pub fn new(policy: RetryConfig) -> Self {
        Self { policy }
    }

    /// Run the attempt loop for one provider. Every attempt, success or
    /// failure, is appended to `attempts`; exhaustion carries the last
    /// underlying error for the orchestrator to record before moving on.
    pub async fn call_provider(
        &self,
        transport: &dyn ProviderTransport,
        provider: &ProviderConfig,
        prompt: &str,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Result<AiReply, ProviderExhausted> {
        let provider_id = provider.entry.id;
        let mut last_error: Option<ProviderCallError> = None;

        for attempt_index in 0..self.policy.max_attempts {
            if attempt_index > 0 {
                let delay = self.retry_delay(attempt_index, last_error.as_ref());
                warn!(
                    event_name = "ai.provider.backoff",
                    provider = %provider_id,
                    attempt = attempt_index,
                    delay_ms = delay.as_millis() as u64,
                    "delaying before retry"
                );
                tokio::time::sleep(delay).await;
            }

            match self.attempt_once(transport, provider, prompt).await {
                Ok(reply) => {
                    attempts.push(AttemptRecord::new(
                        provider_id,
                        attempt_index,
                        AttemptOutcome::Success,
                    ));
                    info!(
                        event_name = "ai.provider.attempt",
                        provider = %provider_id,
                        attempt = attempt_index,
                        outcome = AttemptOutcome::Success.as_str(),
                        "provider call succeeded"
                    );
                    return Ok(reply);
                }
                Err(error) => {
                    let outcome = outcome_for(&error);
                    attempts.push(
                        AttemptRecord::new(provider_id, attempt_index, outcome)
                            .with_detail(error.to_string()),
                    );
                    warn!(
                        event_name = "ai.provider.attempt",
                        provider = %provider_id,
                        attempt = attempt_index,
                        outcome = outcome.as_str(),
                        error = %error,
                        "provider call failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(ProviderExhausted {
            provider: provider_id,
            attempts_made: self.policy.max_attempts,
            last_error: last_error.unwrap_or(ProviderCallError::Transport(
                "no attempt recorded".to_string(),
            )),
        })
    }

    async fn attempt_once(
        &self,
        transport: &dyn ProviderTransport,
        provider: &ProviderConfig,
        prompt: &str,
    ) -> Result<AiReply, ProviderCallError> {
        let request = provider.build_request(prompt);
        let response = transport
            .send(request)
            .await
            .map_err(|error| ProviderCallError::Transport(error.to_string()))?;

        if response.is_rate_limited() {
            return Err(ProviderCallError::RateLimited { retry_after: response.retry_after });
        }
        if !response.is_success() {
            return Err(ProviderCallError::Http {
                status: response.status,
                body: truncate(&response.body, 200),
            });
        }

        let text = extract_text(provider.entry.id, &response.body)?;
        Ok(parse_ai_reply(&text)?)
    }

    /// Delay before attempt `k` (k > 0). A rate-limit hint from the
    /// provider takes precedence over the computed backoff; computed
    /// delays get jitter so synchronized flows fan out.
    fn retry_delay(&self, attempt_index: u32, last_error: Option<&ProviderCallError>) -> Duration {
        if let Some(ProviderCallError::RateLimited { retry_after: Some(hint) }) = last_error {
            return *hint;
        }
        backoff_delay(attempt_index, &self.policy) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        if self.policy.jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=self.policy.jitter_ms))
    }
}

/// `min(base * growth^(k-1), cap)` for attempt index `k`.
pub fn backoff_delay(attempt_index: u32, policy: &RetryConfig) -> Duration {
    let exponent = attempt_index.saturating_sub(1);
    let scaled = policy.base_delay_ms as f64 * policy.growth_factor.powi(exponent as i32);
    Duration::from_millis(scaled.min(policy.cap_delay_ms as f64) as u64)
}

fn outcome_for(error: &ProviderCallError) -> AttemptOutcome {
    match error {
        ProviderCallError::RateLimited { .. } => AttemptOutcome::RateLimited,
        ProviderCallError::Transport(_) | ProviderCallError::Http { .. } => {
            AttemptOutcome::HttpError
        }
        ProviderCallError::Malformed(_) => AttemptOutcome::MalformedResponse,
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use leadly_core::{AiConfig, AiSettings, AttemptOutcome, ProviderId, RetryConfig};

    use super::{backoff_delay, RetryController};
    use crate::providers::ProviderConfig;
    use crate::transport::{ProviderRequest, ProviderResponse, ProviderTransport, TransportError};

    /// Pops scripted responses in order; records how many calls landed.
    struct ScriptedTransport {
        script: Mutex<Vec<Result<ProviderResponse, TransportError>>>,
    }

    impl ScriptedTransport {
        fn new(mut responses: Vec<Result<ProviderResponse, TransportError>>) -> Self {
            responses.reverse();
            Self { script: Mutex::new(responses) }
        }
    }

    #[async_trait]
    impl ProviderTransport for ScriptedTransport {
        async fn send(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, TransportError> {
            self.script.lock().unwrap().pop().expect("script exhausted")
        }
    }

    fn no_delay_policy() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 0,
            growth_factor: 2.0,
            cap_delay_ms: 0,
            jitter_ms: 0,
            provider_cooldown_ms: 0,
        }
    }

    fn openai_provider() -> ProviderConfig {
        let config = AiConfig {
            settings: AiSettings::default(),
            openai_api_key: Some("sk-test".to_string().into()),
            anthropic_api_key: None,
            ollama_base_url: None,
            request_timeout_secs: 30,
            retry: no_delay_policy(),
        };
        ProviderConfig::resolve(ProviderId::OpenAi, &config)
    }

    fn ok_response(content: &str) -> ProviderResponse {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        });
        ProviderResponse { status: 200, retry_after: None, body: body.to_string() }
    }

    fn classification_text() -> String {
        r#"{"purchase_intent": false, "intent_type": "inquiry", "confidence": 0.5}"#.to_string()
    }

    #[test]
    fn rate_limit_hint_overrides_computed_backoff() {
        let policy = RetryConfig {
            max_attempts: 3,
            base_delay_ms: 500,
            growth_factor: 2.0,
            cap_delay_ms: 8_000,
            jitter_ms: 0,
            provider_cooldown_ms: 0,
        };
        let controller = RetryController::new(policy);
        let hinted = crate::errors::ProviderCallError::RateLimited {
            retry_after: Some(Duration::from_secs(12)),
        };

        assert_eq!(controller.retry_delay(1, Some(&hinted)), Duration::from_secs(12));
        assert_eq!(controller.retry_delay(1, None), Duration::from_millis(500));
    }

    #[test]
    fn backoff_grows_exponentially_to_the_cap() {
        let policy = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 500,
            growth_factor: 2.0,
            cap_delay_ms: 1500,
            jitter_ms: 0,
            provider_cooldown_ms: 0,
        };
        assert_eq!(backoff_delay(1, &policy), Duration::from_millis(500));
        assert_eq!(backoff_delay(2, &policy), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3, &policy), Duration::from_millis(1500));
        assert_eq!(backoff_delay(4, &policy), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn first_attempt_success_records_one_attempt() {
        let transport = ScriptedTransport::new(vec![Ok(ok_response(&classification_text()))]);
        let controller = RetryController::new(no_delay_policy());
        let mut attempts = Vec::new();

        let reply = controller
            .call_provider(&transport, &openai_provider(), "prompt", &mut attempts)
            .await
            .unwrap();

        assert!(!reply.purchase_intent);
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].outcome, AttemptOutcome::Success);
        assert_eq!(attempts[0].attempt_index, 0);
    }

    #[tokio::test]
    async fn rate_limits_retry_until_success() {
        let throttled = ProviderResponse {
            status: 429,
            retry_after: Some(Duration::ZERO),
            body: String::new(),
        };
        let transport = ScriptedTransport::new(vec![
            Ok(throttled.clone()),
            Ok(throttled),
            Ok(ok_response(&classification_text())),
        ]);
        let controller = RetryController::new(no_delay_policy());
        let mut attempts = Vec::new();

        let result = controller
            .call_provider(&transport, &openai_provider(), "prompt", &mut attempts)
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0].outcome, AttemptOutcome::RateLimited);
        assert_eq!(attempts[1].outcome, AttemptOutcome::RateLimited);
        assert_eq!(attempts[2].outcome, AttemptOutcome::Success);
    }

    #[tokio::test]
    async fn malformed_response_consumes_an_attempt_but_can_recover() {
        let garbage = ProviderResponse {
            status: 200,
            retry_after: None,
            body: r#"{"choices":[{"message":{"content":"no json here"}}]}"#.to_string(),
        };
        let transport =
            ScriptedTransport::new(vec![Ok(garbage), Ok(ok_response(&classification_text()))]);
        let controller = RetryController::new(no_delay_policy());
        let mut attempts = Vec::new();

        let result = controller
            .call_provider(&transport, &openai_provider(), "prompt", &mut attempts)
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts[0].outcome, AttemptOutcome::MalformedResponse);
        assert_eq!(attempts[1].outcome, AttemptOutcome::Success);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempt_count_and_last_error() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Send("connection refused".to_string())),
            Err(TransportError::Send("connection refused".to_string())),
            Err(TransportError::Send("connection refused".to_string())),
        ]);
        let controller = RetryController::new(no_delay_policy());
        let mut attempts = Vec::new();

        let error = controller
            .call_provider(&transport, &openai_provider(), "prompt", &mut attempts)
            .await
            .unwrap_err();

        assert_eq!(error.provider, ProviderId::OpenAi);
        assert_eq!(error.attempts_made, 3);
        assert_eq!(attempts.len(), 3);
        assert!(attempts.iter().all(|record| record.outcome == AttemptOutcome::HttpError));
    }
}
