//! Store abstraction shared by the in-memory and Postgres backends.

use async_trait::async_trait;
use thiserror::Error;

use fixtrack_auth::{NewUser, User, UserCredentials, UserUpdate};
use fixtrack_core::{DeviceId, DomainError, PartId, TicketId, TicketPartId, UserId};
use fixtrack_inventory::{InsufficientStock, NewPart, Part, PartUpdate, TicketPartDetail};
use fixtrack_workshop::{Device, DeviceUpdate, NewDevice, NewTicket, Ticket, TicketUpdate};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity names used in not-found errors (and their HTTP messages).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Entity {
    User,
    Customer,
    Device,
    Ticket,
    Part,
    TicketPart,
}

impl core::fmt::Display for Entity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Entity::User => "User",
            Entity::Customer => "Customer",
            Entity::Device => "Device",
            Entity::Ticket => "Ticket",
            Entity::Part => "Part",
            Entity::TicketPart => "TicketPart",
        };
        f.write_str(s)
    }
}

/// Failure taxonomy for every store operation.
///
/// Any failure inside a ledger transaction aborts it with zero side effects;
/// atomicity is the sole recovery mechanism.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced entity does not exist.
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: Entity, id: String },

    /// The attach-side stock guard failed. No writes were performed.
    #[error(transparent)]
    InsufficientStock(#[from] InsufficientStock),

    /// A natural key (email, serial number, SKU) is already taken.
    #[error("{0}")]
    Conflict(String),

    /// Input failed validation before any write.
    #[error("{0}")]
    Invalid(String),

    /// The backend itself failed (connection, constraint drift, etc).
    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: Entity, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        // Domain errors are all pre-write rejections; conflicts and missing
        // rows are detected by the stores themselves.
        StoreError::Invalid(err.to_string())
    }
}

/// Storage seam for the whole backend.
///
/// CRUD methods follow a uniform pattern: existence check before
/// update/delete, uniqueness check on natural keys before create/update.
/// The ledger methods (`attach_part`, `detach_part`) are the only writers
/// of `ticket_parts` and the only guarded writers of part stock.
#[async_trait]
pub trait Store: Send + Sync {
    // Users ------------------------------------------------------------

    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: UserId) -> StoreResult<User>;
    /// Email lookup with the stored hash; the login path alone uses this.
    async fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>>;

    // Customers (role-scoped users) -------------------------------------

    async fn list_customers(&self) -> StoreResult<Vec<User>>;
    async fn get_customer(&self, id: UserId) -> StoreResult<User>;
    async fn update_customer(&self, id: UserId, update: UserUpdate) -> StoreResult<User>;
    async fn delete_customer(&self, id: UserId) -> StoreResult<()>;

    // Devices -----------------------------------------------------------

    async fn create_device(&self, new: NewDevice) -> StoreResult<Device>;
    async fn list_devices(&self) -> StoreResult<Vec<Device>>;
    async fn get_device(&self, id: DeviceId) -> StoreResult<Device>;
    async fn update_device(&self, id: DeviceId, update: DeviceUpdate) -> StoreResult<Device>;
    async fn delete_device(&self, id: DeviceId) -> StoreResult<()>;

    // Tickets -----------------------------------------------------------

    async fn create_ticket(&self, new: NewTicket) -> StoreResult<Ticket>;
    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>>;
    async fn get_ticket(&self, id: TicketId) -> StoreResult<Ticket>;
    async fn update_ticket(&self, id: TicketId, update: TicketUpdate) -> StoreResult<Ticket>;
    async fn delete_ticket(&self, id: TicketId) -> StoreResult<()>;

    // Parts -------------------------------------------------------------

    async fn create_part(&self, new: NewPart) -> StoreResult<Part>;
    async fn list_parts(&self) -> StoreResult<Vec<Part>>;
    async fn get_part(&self, id: PartId) -> StoreResult<Part>;
    async fn update_part(&self, id: PartId, update: PartUpdate) -> StoreResult<Part>;
    async fn delete_part(&self, id: PartId) -> StoreResult<()>;

    // Inventory ledger --------------------------------------------------

    /// Consume part stock against a ticket, in one atomic transaction.
    ///
    /// Order inside the transaction: ticket existence, part existence
    /// (row-locked), stock guard against the newly requested quantity,
    /// decrement, merge-or-create of the `(ticket, part)` row. Two attaches
    /// on the same part serialize at the lock; failures leave no writes.
    async fn attach_part(
        &self,
        ticket_id: TicketId,
        part_id: PartId,
        quantity: i64,
    ) -> StoreResult<TicketPartDetail>;

    /// Release a consumption record, restoring its full quantity to stock.
    async fn detach_part(&self, id: TicketPartId) -> StoreResult<()>;

    async fn list_ticket_parts(&self) -> StoreResult<Vec<TicketPartDetail>>;
    /// Rows for one ticket, newest first. Fails if the ticket is absent.
    async fn list_ticket_parts_for_ticket(
        &self,
        ticket_id: TicketId,
    ) -> StoreResult<Vec<TicketPartDetail>>;
    async fn get_ticket_part(&self, id: TicketPartId) -> StoreResult<TicketPartDetail>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_domain_error_surfaces_as_invalid() {
        let err: StoreError = DomainError::validation("quantity must be >= 1").into();
        assert!(matches!(err, StoreError::Invalid(_)));

        let err: StoreError = DomainError::invalid_id("TicketId: bad uuid").into();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn not_found_names_the_entity_and_id() {
        let id = TicketId::new();
        let err = StoreError::not_found(Entity::Ticket, id);
        assert_eq!(err.to_string(), format!("Ticket with ID {id} not found"));
    }
}
