use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fixtrack_core::{DeviceId, DomainError, UserId};

/// Repair progress of a device in the shop.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Pending,
    InProgress,
    Completed,
    Delivered,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Pending => "PENDING",
            DeviceStatus::InProgress => "IN_PROGRESS",
            DeviceStatus::Completed => "COMPLETED",
            DeviceStatus::Delivered => "DELIVERED",
        }
    }
}

impl core::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DeviceStatus::Pending),
            "IN_PROGRESS" => Ok(DeviceStatus::InProgress),
            "COMPLETED" => Ok(DeviceStatus::Completed),
            "DELIVERED" => Ok(DeviceStatus::Delivered),
            other => Err(DomainError::validation(format!(
                "invalid status: {other}. Must be one of: PENDING, IN_PROGRESS, COMPLETED, DELIVERED"
            ))),
        }
    }
}

/// A customer's device registered for repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub brand: String,
    pub model: String,
    /// Natural key; unique across the shop.
    pub serial_number: String,
    pub status: DeviceStatus,
    pub price: f64,
    pub owner_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a device. Status defaults to `Pending`, price to 0.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub brand: String,
    pub model: String,
    pub serial_number: String,
    pub status: Option<DeviceStatus>,
    pub price: Option<f64>,
    pub customer_id: UserId,
}

impl NewDevice {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.serial_number.trim().is_empty() {
            return Err(DomainError::validation("serialNumber must not be empty"));
        }
        if let Some(price) = self.price {
            if price < 0.0 {
                return Err(DomainError::validation("price must be >= 0"));
            }
        }
        Ok(())
    }
}

/// Partial update of a device.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<DeviceStatus>,
    pub price: Option<f64>,
    pub customer_id: Option<UserId>,
}

impl DeviceUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(serial) = &self.serial_number {
            if serial.trim().is_empty() {
                return Err(DomainError::validation("serialNumber must not be empty"));
            }
        }
        if let Some(price) = self.price {
            if price < 0.0 {
                return Err(DomainError::validation("price must be >= 0"));
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
            DeviceStatus::Pending,
            DeviceStatus::InProgress,
            DeviceStatus::Completed,
            DeviceStatus::Delivered,
        ] {
            assert_eq!(s.as_str().parse::<DeviceStatus>().unwrap(), s);
        }
    }

    #[test]
    fn blank_serial_is_rejected() {
        let new = NewDevice {
            brand: "Samsung".to_string(),
            model: "Galaxy S21".to_string(),
            serial_number: "".to_string(),
            status: None,
            price: None,
            customer_id: UserId::new(),
        };
        assert!(new.validate().is_err());
    }
}
