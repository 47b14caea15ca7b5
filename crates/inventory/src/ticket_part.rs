use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fixtrack_core::{PartId, TicketId, TicketPartId};
use fixtrack_workshop::TicketStatus;

/// A consumption record linking one ticket to one part.
///
/// Unique per `(ticket_id, part_id)` pair; created when a part is first
/// attached, quantity-merged on repeat attaches, deleted (with stock
/// restored) on detach. There is no standalone quantity update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPart {
    pub id: TicketPartId,
    pub ticket_id: TicketId,
    pub part_id: PartId,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// Restricted ticket view joined onto ledger responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub id: TicketId,
    pub issue_description: String,
    pub status: TicketStatus,
}

/// Restricted part view joined onto ledger responses.
///
/// `stock_quantity` here is the balance *after* the operation committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSummary {
    pub id: PartId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub stock_quantity: i64,
    pub price: f64,
}

/// A ledger row joined with its ticket and part summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPartDetail {
    #[serde(flatten)]
    pub record: TicketPart,
    pub ticket: TicketSummary,
    pub part: PartSummary,
}
