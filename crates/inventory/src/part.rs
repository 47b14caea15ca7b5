use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fixtrack_core::{DomainError, PartId};

/// An inventory part.
///
/// Invariant: `stock_quantity >= 0` at all times, including mid-transaction.
/// The stored quantity is the live balance, already net of every committed
/// reservation; nothing else needs to be subtracted before checking it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: PartId,
    pub name: String,
    /// Natural key; unique when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub stock_quantity: i64,
    pub price: f64,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

/// Stock guard failure: the live balance cannot cover the requested amount.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Insufficient stock. Available: {available}, Requested: {requested}")]
pub struct InsufficientStock {
    pub available: i64,
    pub requested: i64,
}

/// The attach-side stock guard.
///
/// Checks the *newly requested* quantity alone against the live balance.
/// When merging into an existing ticket-part row the prior reservation is
/// already reflected in `available`, so it must not be counted again.
pub fn check_stock(available: i64, requested: i64) -> Result<(), InsufficientStock> {
    if available < requested {
        Err(InsufficientStock {
            available,
            requested,
        })
    } else {
        Ok(())
    }
}

/// Reject non-positive consumption requests before any store work happens.
pub fn validate_requested_quantity(quantity: i64) -> Result<(), DomainError> {
    if quantity < 1 {
        Err(DomainError::validation("quantity must be >= 1"))
    } else {
        Ok(())
    }
}

/// Input for creating a part.
#[derive(Debug, Clone)]
pub struct NewPart {
    pub name: String,
    pub sku: Option<String>,
    pub stock_quantity: i64,
    pub price: f64,
    pub cost: f64,
}

impl NewPart {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        if self.stock_quantity < 0 {
            return Err(DomainError::validation("stockQuantity must be >= 0"));
        }
        if self.price < 0.0 || self.cost < 0.0 {
            return Err(DomainError::validation("price and cost must be >= 0"));
        }
        Ok(())
    }
}

/// Partial update of a part.
///
/// Direct `stock_quantity` edits here are plain CRUD (restock, audit
/// correction); guarded adjustment belongs to the ledger alone.
#[derive(Debug, Clone, Default)]
pub struct PartUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub stock_quantity: Option<i64>,
    pub price: Option<f64>,
    pub cost: Option<f64>,
}

impl PartUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name must not be empty"));
            }
        }
        if let Some(qty) = self.stock_quantity {
            if qty < 0 {
                return Err(DomainError::validation("stockQuantity must be >= 0"));
            }
        }
        if self.price.is_some_and(|p| p < 0.0) || self.cost.is_some_and(|c| c < 0.0) {
            return Err(DomainError::validation("price and cost must be >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn exact_stock_is_allowed() {
        assert!(check_stock(5, 5).is_ok());
    }

    #[test]
    fn shortfall_reports_both_sides() {
        let err = check_stock(3, 5).unwrap_err();
        assert_eq!(
            err,
            InsufficientStock {
                available: 3,
                requested: 5
            }
        );
    }

    #[test]
    fn zero_and_negative_quantities_are_invalid_requests() {
        assert!(validate_requested_quantity(0).is_err());
        assert!(validate_requested_quantity(-4).is_err());
        assert!(validate_requested_quantity(1).is_ok());
    }

    proptest! {
        // A passing guard never lets the balance go negative.
        #[test]
        fn guard_preserves_non_negative_balance(available in 0i64..10_000, requested in 1i64..10_000) {
            if check_stock(available, requested).is_ok() {
                prop_assert!(available - requested >= 0);
            } else {
                prop_assert!(available < requested);
            }
        }

        // The error always carries the exact observed values.
        #[test]
        fn guard_error_is_faithful(available in 0i64..1_000, over in 1i64..1_000) {
            let requested = available + over;
            let err = check_stock(available, requested).unwrap_err();
            prop_assert_eq!(err.available, available);
            prop_assert_eq!(err.requested, requested);
        }
    }
}
