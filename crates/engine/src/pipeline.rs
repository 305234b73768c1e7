use chrono::{DateTime, Utc};

use leadly_core::{ClassificationOutcome, LeadContext};

use crate::dispatch::{ActionDispatcher, AdminNotifier, ConversionWorkflow, LeadStore};
use crate::reply::ReplyClassifier;

/// Classification plus dispatch: the one inbound operation hosts call.
///
/// Classification itself never fails; only the dispatcher's external
/// calls can produce the failure arm, and even then the computed
/// classification rides along in the outcome.
pub struct ReplyPipeline<S, C, N> {
    classifier: ReplyClassifier,
    dispatcher: ActionDispatcher<S, C, N>,
}

impl<S, C, N> ReplyPipeline<S, C, N>
where
    S: LeadStore,
    C: ConversionWorkflow,
    N: AdminNotifier,
{
    pub fn new(classifier: ReplyClassifier, dispatcher: ActionDispatcher<S, C, N>) -> Self {
        Self { classifier, dispatcher }
    }

    pub async fn classify_reply(
        &self,
        lead: &LeadContext,
        raw_reply: &str,
        subject: Option<&str>,
        received_at: Option<DateTime<Utc>>,
    ) -> ClassificationOutcome {
        let classification = self.classifier.classify(lead, raw_reply, subject, received_at).await;
        let report = self.dispatcher.dispatch(lead, &classification, subject).await;

        if report.succeeded() {
            ClassificationOutcome::Classified { classification }
        } else {
            let error = report
                .errors
                .iter()
                .map(|error| error.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            ClassificationOutcome::Failed { error, classification: Some(classification) }
        }
    }
}
