use std::time::Duration;

use thiserror::Error;

use leadly_core::{AttemptRecord, ProviderId};

/// Why a provider payload could not be turned into a classification.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("response carried no text content")]
    MissingText,
    #[error("no JSON object found in response text")]
    MissingJson,
    #[error("response JSON did not match the expected shape: {0}")]
    BadShape(String),
    #[error("response violated the purchase-intent invariant")]
    InvariantViolation,
}

/// Failure of one attempt against one provider. Unconfigured providers
/// never reach the attempt loop; the orchestrator skips them before any
/// call is made, so every variant here is retryable.
#[derive(Clone, Debug, Error)]
pub enum ProviderCallError {
    #[error("provider signalled rate limiting")]
    RateLimited { retry_after: Option<Duration> },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed provider response: {0}")]
    Malformed(#[from] ParseFailure),
}

/// Terminal outcome for one provider: every allotted attempt was consumed.
#[derive(Debug, Error)]
#[error("provider `{provider}` exhausted after {attempts_made} attempts: {last_error}")]
pub struct ProviderExhausted {
    pub provider: ProviderId,
    pub attempts_made: u32,
    pub last_error: ProviderCallError,
}

/// Terminal outcome for the AI path as a whole. The reply classifier
/// catches both variants and degrades to the keyword result.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("ai classification is disabled by settings")]
    AiDisabled,
    #[error("all providers skipped or exhausted after {} attempts", .attempts.len())]
    AllProvidersExhausted { attempts: Vec<AttemptRecord> },
}

/// External-collaborator failures inside the action dispatcher. These are
/// surfaced to the caller but never re-invoke classification.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("conversion workflow failed: {0}")]
    Conversion(String),
    #[error("invoice send failed: {0}")]
    InvoiceSend(String),
    #[error("admin notification failed: {0}")]
    Notification(String),
    #[error("lead status update failed: {0}")]
    StatusUpdate(String),
}

#[cfg(test)]
mod tests {
    use super::{ParseFailure, ProviderCallError};

    #[test]
    fn parse_failures_lift_into_call_errors() {
        let error: ProviderCallError = ParseFailure::MissingJson.into();
        assert!(matches!(error, ProviderCallError::Malformed(ParseFailure::MissingJson)));
        assert_eq!(
            error.to_string(),
            "malformed provider response: no JSON object found in response text"
        );
    }
}
