use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leadly_core::config::{AppConfig, LoadOptions};
use leadly_core::{AiSettings, Classification, ClassificationOutcome, LeadContext, LeadId, LeadStatus};
use leadly_engine::dispatch::{ActionDispatcher, AdminNotifier, ConversionWorkflow, LeadStore};
use leadly_engine::reply::SettingsReader;
use leadly_engine::{HttpTransport, Orchestrator, ReplyClassifier, ReplyPipeline};

use super::CommandResult;
use crate::ClassifyArgs;

/// Settings come from the static config; there is no per-request
/// settings store behind the CLI.
struct StaticSettings(AiSettings);

#[async_trait]
impl SettingsReader for StaticSettings {
    async fn ai_settings(&self) -> Option<AiSettings> {
        Some(self.0)
    }
}

/// CLI collaborators announce the action instead of performing it; no
/// record store or billing system is attached to a terminal session.
struct AnnouncedActions;

#[async_trait]
impl LeadStore for AnnouncedActions {
    async fn update_lead_status(
        &self,
        lead: &LeadContext,
        status: LeadStatus,
        extra_fields: serde_json::Value,
    ) -> anyhow::Result<()> {
        tracing::info!(
            event_name = "cli.action.status_update",
            lead_id = %lead.lead_id,
            status = status.as_str(),
            extra_fields = %extra_fields,
            "would update lead status"
        );
        Ok(())
    }
}

#[async_trait]
impl ConversionWorkflow for AnnouncedActions {
    async fn trigger_conversion(&self, lead: &LeadContext) -> anyhow::Result<()> {
        tracing::info!(
            event_name = "cli.action.conversion",
            lead_id = %lead.lead_id,
            "would trigger conversion"
        );
        Ok(())
    }

    async fn send_invoice(&self, lead: &LeadContext) -> anyhow::Result<()> {
        tracing::info!(
            event_name = "cli.action.invoice",
            lead_id = %lead.lead_id,
            "would send invoice"
        );
        Ok(())
    }
}

#[async_trait]
impl AdminNotifier for AnnouncedActions {
    async fn notify_admin(
        &self,
        lead: &LeadContext,
        _classification: &Classification,
        subject: &str,
        _body: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(
            event_name = "cli.action.escalation",
            lead_id = %lead.lead_id,
            subject,
            "would notify admin for manual review"
        );
        Ok(())
    }
}

pub fn run(args: &ClassifyArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("classify", "config", error.to_string(), 2),
    };
    init_logging(&config);

    let raw_reply = match read_reply(args.reply_file.as_deref()) {
        Ok(text) => text,
        Err(error) => return CommandResult::failure("classify", "io", error.to_string(), 1),
    };
    if raw_reply.trim().is_empty() {
        return CommandResult::failure("classify", "input", "reply text is empty", 1);
    }

    let transport = match HttpTransport::new(Duration::from_secs(config.ai.request_timeout_secs)) {
        Ok(transport) => transport,
        Err(error) => return CommandResult::failure("classify", "transport", error.to_string(), 1),
    };

    let settings = config.ai.settings;
    let orchestrator = Orchestrator::new(config.ai, Arc::new(transport));
    let classifier =
        ReplyClassifier::new(Arc::new(StaticSettings(settings)), settings, orchestrator);
    let dispatcher = ActionDispatcher::new(AnnouncedActions, AnnouncedActions, AnnouncedActions);
    let pipeline = ReplyPipeline::new(classifier, dispatcher);

    let lead = LeadContext {
        lead_id: LeadId(args.lead_id.clone()),
        name: args.name.clone(),
        organization: args.organization.clone(),
        program: args.program.clone(),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("classify", "runtime", error.to_string(), 1),
    };

    let outcome = runtime.block_on(pipeline.classify_reply(
        &lead,
        &raw_reply,
        args.subject.as_deref(),
        None,
    ));

    let exit_code = match &outcome {
        ClassificationOutcome::Classified { .. } => 0,
        ClassificationOutcome::Failed { .. } => 1,
    };
    let output = serde_json::to_string_pretty(&outcome)
        .unwrap_or_else(|error| format!("{{\"success\":false,\"error\":\"{error}\"}}"));

    CommandResult { exit_code, output }
}

fn read_reply(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn init_logging(config: &AppConfig) {
    use leadly_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let _ = match config.logging.format {
        Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .compact()
            .try_init(),
        Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .pretty()
            .try_init(),
        Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .json()
            .try_init(),
    };
}
