use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The slice of a lead record the engine needs for prompting and dispatch.
///
/// The lead itself is externally owned; the engine only references it and
/// requests status transitions through the `LeadStore` collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadContext {
    pub lead_id: LeadId,
    pub name: String,
    pub organization: String,
    pub program: String,
}

/// Lead lifecycle vocabulary.
///
/// The full enumeration is owned by the external record store; the engine
/// only ever requests the `InvoiceSent`, `InvoiceCreatedNotSent`, and
/// `ReplyReceivedAwaitingAction` transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    Contacted,
    ReplyReceivedAwaitingAction,
    InvoiceCreatedNotSent,
    InvoiceSent,
    ConvertedPaid,
    Closed,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::ReplyReceivedAwaitingAction => "Reply Received - Awaiting Action",
            Self::InvoiceCreatedNotSent => "Invoice Created - Not Sent",
            Self::InvoiceSent => "Invoice Sent",
            Self::ConvertedPaid => "Converted - Paid",
            Self::Closed => "Closed",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "New" => Ok(Self::New),
            "Contacted" => Ok(Self::Contacted),
            "Reply Received - Awaiting Action" => Ok(Self::ReplyReceivedAwaitingAction),
            "Invoice Created - Not Sent" => Ok(Self::InvoiceCreatedNotSent),
            "Invoice Sent" => Ok(Self::InvoiceSent),
            "Converted - Paid" => Ok(Self::ConvertedPaid),
            "Closed" => Ok(Self::Closed),
            other => Err(DomainError::UnknownLeadStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
