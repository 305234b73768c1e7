//! Action dispatch: turn a classification into external side effects and
//! one lead status transition request.
//!
//! Terminal for the request. The dispatcher never loops back into
//! classification; external failures are collected into the report and
//! surfaced to the caller alongside the already-computed classification.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use leadly_core::{Classification, IntentType, LeadContext, LeadStatus};

use crate::errors::DispatchError;

/// External lead record store. The engine requests exactly one status
/// transition per dispatch.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn update_lead_status(
        &self,
        lead: &LeadContext,
        status: LeadStatus,
        extra_fields: serde_json::Value,
    ) -> anyhow::Result<()>;
}

/// External conversion workflow: flips the lead to a customer and sends
/// the invoice through the payment provider.
#[async_trait]
pub trait ConversionWorkflow: Send + Sync {
    async fn trigger_conversion(&self, lead: &LeadContext) -> anyhow::Result<()>;
    async fn send_invoice(&self, lead: &LeadContext) -> anyhow::Result<()>;
}

/// External manual-review escalation.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify_admin(
        &self,
        lead: &LeadContext,
        classification: &Classification,
        subject: &str,
        body: &str,
    ) -> anyhow::Result<()>;
}

/// Which terminal action the dispatcher took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchedAction {
    AutoConversion,
    ManualEscalation,
}

#[derive(Debug)]
pub struct DispatchReport {
    pub action: DispatchedAction,
    pub status_requested: Option<LeadStatus>,
    pub errors: Vec<DispatchError>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct ActionDispatcher<S, C, N> {
    lead_store: S,
    conversion: C,
    notifier: N,
}

impl<S, C, N> ActionDispatcher<S, C, N>
where
    S: LeadStore,
    C: ConversionWorkflow,
    N: AdminNotifier,
{
    pub fn new(lead_store: S, conversion: C, notifier: N) -> Self {
        Self { lead_store, conversion, notifier }
    }

    /// Dispatch one classification.
    ///
    /// The lead status update is a single write request with no
    /// read-modify-write: two near-simultaneous replies for the same lead
    /// can race and land transitions out of order. That matches the
    /// source system's behavior and is deliberately not serialized here;
    /// the record store owns the lead and other writers exist.
    pub async fn dispatch(
        &self,
        lead: &LeadContext,
        classification: &Classification,
        subject: Option<&str>,
    ) -> DispatchReport {
        if classification.purchase_intent
            && classification.intent_type == IntentType::ReadyToPurchase
        {
            self.dispatch_conversion(lead).await
        } else {
            self.dispatch_escalation(lead, classification, subject).await
        }
    }

    async fn dispatch_conversion(&self, lead: &LeadContext) -> DispatchReport {
        let mut errors = Vec::new();

        if let Err(error) = self.conversion.trigger_conversion(lead).await {
            warn!(
                event_name = "dispatch.conversion_failed",
                lead_id = %lead.lead_id,
                error = %error,
                "conversion workflow failed, no status transition requested"
            );
            errors.push(DispatchError::Conversion(error.to_string()));
            return DispatchReport {
                action: DispatchedAction::AutoConversion,
                status_requested: None,
                errors,
            };
        }

        // Invoice delivery is best-effort: a send failure downgrades the
        // requested status but never rolls back the conversion.
        let status = match self.conversion.send_invoice(lead).await {
            Ok(()) => LeadStatus::InvoiceSent,
            Err(error) => {
                warn!(
                    event_name = "dispatch.invoice_send_failed",
                    lead_id = %lead.lead_id,
                    error = %error,
                    "invoice send failed, marking created-not-sent"
                );
                errors.push(DispatchError::InvoiceSend(error.to_string()));
                LeadStatus::InvoiceCreatedNotSent
            }
        };

        if let Err(error) = self.lead_store.update_lead_status(lead, status, json!({})).await {
            errors.push(DispatchError::StatusUpdate(error.to_string()));
        }

        info!(
            event_name = "dispatch.conversion",
            lead_id = %lead.lead_id,
            status = status.as_str(),
            errors = errors.len(),
            "automatic conversion dispatched"
        );
        DispatchReport {
            action: DispatchedAction::AutoConversion,
            status_requested: Some(status),
            errors,
        }
    }

    async fn dispatch_escalation(
        &self,
        lead: &LeadContext,
        classification: &Classification,
        subject: Option<&str>,
    ) -> DispatchReport {
        let mut errors = Vec::new();

        let subject_line = subject.unwrap_or("Lead reply needs review");
        let body = escalation_body(lead, classification);
        if let Err(error) =
            self.notifier.notify_admin(lead, classification, subject_line, &body).await
        {
            errors.push(DispatchError::Notification(error.to_string()));
        }

        let status = LeadStatus::ReplyReceivedAwaitingAction;
        let extra_fields = json!({
            "suggested_response": classification.suggested_response,
        });
        if let Err(error) = self.lead_store.update_lead_status(lead, status, extra_fields).await {
            errors.push(DispatchError::StatusUpdate(error.to_string()));
        }

        info!(
            event_name = "dispatch.escalation",
            lead_id = %lead.lead_id,
            intent = classification.intent_type.as_str(),
            errors = errors.len(),
            "manual-review escalation dispatched"
        );
        DispatchReport {
            action: DispatchedAction::ManualEscalation,
            status_requested: Some(status),
            errors,
        }
    }
}

fn escalation_body(lead: &LeadContext, classification: &Classification) -> String {
    format!(
        "Lead {} ({}) replied with intent `{}` at confidence {:.2}.\n\
         Primary concern: {}\nSuggested response: {}",
        lead.name,
        lead.organization,
        classification.intent_type.as_str(),
        classification.confidence,
        classification.primary_concern,
        classification.suggested_response,
    )
}
