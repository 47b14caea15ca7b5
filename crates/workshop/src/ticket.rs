use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fixtrack_core::{DeviceId, DomainError, TicketId};

/// Lifecycle state of a repair ticket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::InProgress => "IN_PROGRESS",
            TicketStatus::Resolved => "RESOLVED",
            TicketStatus::Closed => "CLOSED",
            TicketStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(TicketStatus::Open),
            "IN_PROGRESS" => Ok(TicketStatus::InProgress),
            "RESOLVED" => Ok(TicketStatus::Resolved),
            "CLOSED" => Ok(TicketStatus::Closed),
            "CANCELLED" => Ok(TicketStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "invalid status: {other}. Must be one of: OPEN, IN_PROGRESS, RESOLVED, CLOSED, CANCELLED"
            ))),
        }
    }
}

/// Urgency of a repair ticket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "LOW",
            TicketPriority::Medium => "MEDIUM",
            TicketPriority::High => "HIGH",
            TicketPriority::Urgent => "URGENT",
        }
    }
}

impl core::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(TicketPriority::Low),
            "MEDIUM" => Ok(TicketPriority::Medium),
            "HIGH" => Ok(TicketPriority::High),
            "URGENT" => Ok(TicketPriority::Urgent),
            other => Err(DomainError::validation(format!(
                "invalid priority: {other}. Must be one of: LOW, MEDIUM, HIGH, URGENT"
            ))),
        }
    }
}

/// A repair request against a device.
///
/// The inventory ledger only ever reads tickets (existence + summary);
/// mutation goes through the plain CRUD path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub device_id: DeviceId,
    pub issue_description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for opening a ticket. Status defaults to `Open`, priority to `Medium`.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub device_id: DeviceId,
    pub issue_description: String,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub estimated_cost: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTicket {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.issue_description.trim().is_empty() {
            return Err(DomainError::validation("issueDescription must not be empty"));
        }
        if let Some(cost) = self.estimated_cost {
            if cost < 0.0 {
                return Err(DomainError::validation("estimatedCost must be >= 0"));
            }
        }
        Ok(())
    }
}

/// Partial update of a ticket.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub device_id: Option<DeviceId>,
    pub issue_description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub estimated_cost: Option<f64>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TicketUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(desc) = &self.issue_description {
            if desc.trim().is_empty() {
                return Err(DomainError::validation("issueDescription must not be empty"));
            }
        }
        if let Some(cost) = self.estimated_cost {
            if cost < 0.0 {
                return Err(DomainError::validation("estimatedCost must be >= 0"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::Resolved,
            TicketStatus::Closed,
            TicketStatus::Cancelled,
        ] {
            assert_eq!(s.as_str().parse::<TicketStatus>().unwrap(), s);
        }
    }

    #[test]
    fn blank_description_is_rejected() {
        let new = NewTicket {
            device_id: DeviceId::new(),
            issue_description: "   ".to_string(),
            status: None,
            priority: None,
            estimated_cost: None,
            due_date: None,
        };
        assert!(new.validate().is_err());
    }

    #[test]
    fn negative_estimate_is_rejected() {
        let update = TicketUpdate {
            estimated_cost: Some(-1.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
