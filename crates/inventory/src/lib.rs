//! `fixtrack-inventory` — parts stock and the ticket consumption ledger domain.
//!
//! The transactional orchestration lives in `fixtrack-infra`; this crate owns
//! the pure pieces: the part model, the stock guard, and the ledger record
//! shapes.

pub mod part;
pub mod ticket_part;

pub use part::{check_stock, validate_requested_quantity, InsufficientStock, NewPart, Part, PartUpdate};
pub use ticket_part::{PartSummary, TicketPart, TicketPartDetail, TicketSummary};
