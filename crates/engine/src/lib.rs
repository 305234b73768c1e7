//! Hybrid intent classification and multi-provider AI orchestration.
//!
//! The engine takes one customer reply and decides whether the customer
//! intends to purchase, then dispatches the follow-up action:
//!
//! 1. **Quote stripping** (`reply`) - isolate the new, non-quoted text
//! 2. **Keyword classification** (`keyword`) - deterministic fast path;
//!    high-confidence purchase intent skips the AI entirely
//! 3. **AI orchestration** (`orchestrator`) - an ordered provider
//!    fallback chain with per-provider retry/backoff (`retry`) and
//!    response normalization (`normalize`)
//! 4. **Action dispatch** (`dispatch`) - automatic conversion or
//!    manual-review escalation, plus one lead status transition
//!
//! # Failure policy
//!
//! The AI path is allowed to fail; the classification is not. Every
//! provider outcome lands in an append-only attempt log, and total AI
//! failure degrades to the keyword result (fail-open). Only the
//! dispatcher's external collaborators can surface a hard error, and the
//! computed classification is preserved alongside it.

pub mod dispatch;
pub mod errors;
pub mod keyword;
pub mod normalize;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod reply;
pub mod retry;
pub mod transport;

pub use dispatch::{
    ActionDispatcher, AdminNotifier, ConversionWorkflow, DispatchReport, DispatchedAction,
    LeadStore,
};
pub use errors::{
    DispatchError, OrchestratorError, ParseFailure, ProviderCallError, ProviderExhausted,
};
pub use keyword::KeywordClassifier;
pub use normalize::{parse_ai_reply, AiReply};
pub use orchestrator::{model_priority, Orchestrator};
pub use pipeline::ReplyPipeline;
pub use providers::{catalog_entry, CatalogEntry, ProviderConfig, CATALOG};
pub use reply::{ReplyClassifier, SettingsReader};
pub use retry::RetryController;
pub use transport::{
    HttpTransport, ProviderRequest, ProviderResponse, ProviderTransport, TransportError,
};
