//! Postgres-backed store implementation.
//!
//! Expected schema (all ids are `uuid`, enums are stored as `text`):
//!
//! ```sql
//! CREATE TABLE users (
//!     id            uuid PRIMARY KEY,
//!     email         text NOT NULL UNIQUE,
//!     name          text,
//!     role          text NOT NULL,
//!     password_hash text NOT NULL,
//!     created_at    timestamptz NOT NULL
//! );
//!
//! CREATE TABLE devices (
//!     id            uuid PRIMARY KEY,
//!     brand         text NOT NULL,
//!     model         text NOT NULL,
//!     serial_number text NOT NULL UNIQUE,
//!     status        text NOT NULL,
//!     price         double precision NOT NULL,
//!     owner_id      uuid NOT NULL REFERENCES users(id),
//!     assignee_id   uuid REFERENCES users(id),
//!     created_at    timestamptz NOT NULL
//! );
//!
//! CREATE TABLE tickets (
//!     id                uuid PRIMARY KEY,
//!     device_id         uuid NOT NULL REFERENCES devices(id),
//!     issue_description text NOT NULL,
//!     status            text NOT NULL,
//!     priority          text NOT NULL,
//!     estimated_cost    double precision,
//!     due_date          timestamptz,
//!     created_at        timestamptz NOT NULL
//! );
//!
//! CREATE TABLE parts (
//!     id             uuid PRIMARY KEY,
//!     name           text NOT NULL,
//!     sku            text UNIQUE,
//!     stock_quantity bigint NOT NULL CHECK (stock_quantity >= 0),
//!     price          double precision NOT NULL,
//!     cost           double precision NOT NULL,
//!     created_at     timestamptz NOT NULL
//! );
//!
//! CREATE TABLE ticket_parts (
//!     id         uuid PRIMARY KEY,
//!     ticket_id  uuid NOT NULL REFERENCES tickets(id),
//!     part_id    uuid NOT NULL REFERENCES parts(id),
//!     quantity   bigint NOT NULL CHECK (quantity >= 1),
//!     created_at timestamptz NOT NULL,
//!     UNIQUE (ticket_id, part_id)
//! );
//! ```
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` | `Conflict` | Unique violation (email, serial number, SKU, (ticket_id, part_id)) |
//! | `23503` | `Conflict` | Foreign key violation on delete (entity still referenced) |
//! | `23514` | `Invalid` | Check constraint violation (negative stock, quantity < 1) |
//! | other | `Backend` | Connection failures, pool closed, schema drift |
//!
//! ## Concurrency
//!
//! `attach_part` locks the part row with `SELECT ... FOR UPDATE` before the
//! stock guard, so concurrent attaches on the same part serialize and the
//! guard always sees the committed balance. The `stock_quantity >= 0` check
//! constraint and the unique `(ticket_id, part_id)` index back the same
//! invariants at the database level.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use fixtrack_auth::{NewUser, User, UserCredentials, UserRole, UserUpdate};
use fixtrack_core::{DeviceId, PartId, TicketId, TicketPartId, UserId};
use fixtrack_inventory::{
    check_stock, validate_requested_quantity, NewPart, Part, PartSummary, PartUpdate, TicketPart,
    TicketPartDetail, TicketSummary,
};
use fixtrack_workshop::{
    Device, DeviceStatus, DeviceUpdate, NewDevice, NewTicket, Ticket, TicketPriority, TicketStatus,
    TicketUpdate,
};

use super::{Entity, Store, StoreError, StoreResult};

/// Postgres-backed store. Cheap to clone; the pool is internally shared.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn email_taken(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        email: &str,
        except: Option<UserId>,
    ) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT 1 AS hit FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(email)
        .bind(except.map(|id| *id.as_uuid()))
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("email_taken", e))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl Store for PostgresStore {
    // Users ------------------------------------------------------------

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        new.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        if self.email_taken(&mut tx, &new.email, None).await? {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::conflict(format!(
                "User with email {} already exists",
                new.email
            )));
        }

        let user = User {
            id: UserId::new(),
            email: new.email,
            name: new.name,
            role: new.role,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&new.password_hash)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, email, name, role, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter()
            .map(|row| UserRow::from_row(row).map_err(row_decode)?.into_user())
            .collect()
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        let row = sqlx::query("SELECT id, email, name, role, created_at FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?
            .ok_or_else(|| StoreError::not_found(Entity::User, id))?;

        UserRow::from_row(&row).map_err(row_decode)?.into_user()
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        let row = sqlx::query(
            "SELECT id, email, name, role, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_credentials", e))?;

        match row {
            Some(row) => {
                let creds = CredentialsRow::from_row(&row).map_err(row_decode)?;
                Ok(Some(creds.into_credentials()?))
            }
            None => Ok(None),
        }
    }

    // Customers ---------------------------------------------------------

    async fn list_customers(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, name, role, created_at
            FROM users
            WHERE role = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(UserRole::Customer.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_customers", e))?;

        rows.iter()
            .map(|row| UserRow::from_row(row).map_err(row_decode)?.into_user())
            .collect()
    }

    async fn get_customer(&self, id: UserId) -> StoreResult<User> {
        let row = sqlx::query(
            "SELECT id, email, name, role, created_at FROM users WHERE id = $1 AND role = $2",
        )
        .bind(id.as_uuid())
        .bind(UserRole::Customer.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_customer", e))?
        .ok_or_else(|| StoreError::not_found(Entity::Customer, id))?;

        UserRow::from_row(&row).map_err(row_decode)?.into_user()
    }

    async fn update_customer(&self, id: UserId, update: UserUpdate) -> StoreResult<User> {
        update.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let exists = sqlx::query("SELECT 1 AS hit FROM users WHERE id = $1 AND role = $2 FOR UPDATE")
            .bind(id.as_uuid())
            .bind(UserRole::Customer.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_customer", e))?;
        if exists.is_none() {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::not_found(Entity::Customer, id));
        }

        if let Some(email) = &update.email {
            if self.email_taken(&mut tx, email, Some(id)).await? {
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::conflict(format!(
                    "User with email {email} already exists"
                )));
            }
        }

        let row = sqlx::query(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $1
            RETURNING id, email, name, role, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.email)
        .bind(update.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_customer", e))?;

        let user = UserRow::from_row(&row).map_err(row_decode)?.into_user()?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(user)
    }

    async fn delete_customer(&self, id: UserId) -> StoreResult<()> {
        let owns_devices = sqlx::query("SELECT 1 AS hit FROM devices WHERE owner_id = $1 LIMIT 1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_customer", e))?;
        if owns_devices.is_some() {
            return Err(StoreError::conflict(
                "Customer still owns registered devices",
            ));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND role = $2")
            .bind(id.as_uuid())
            .bind(UserRole::Customer.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_customer", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Entity::Customer, id));
        }
        Ok(())
    }

    // Devices -----------------------------------------------------------

    async fn create_device(&self, new: NewDevice) -> StoreResult<Device> {
        new.validate()?;

        let owner = sqlx::query("SELECT 1 AS hit FROM users WHERE id = $1 AND role = $2")
            .bind(new.customer_id.as_uuid())
            .bind(UserRole::Customer.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_device", e))?;
        if owner.is_none() {
            return Err(StoreError::not_found(Entity::Customer, new.customer_id));
        }

        let device = Device {
            id: DeviceId::new(),
            brand: new.brand,
            model: new.model,
            serial_number: new.serial_number,
            status: new.status.unwrap_or(DeviceStatus::Pending),
            price: new.price.unwrap_or(0.0),
            owner_id: new.customer_id,
            assignee_id: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO devices (id, brand, model, serial_number, status, price, owner_id, assignee_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(device.id.as_uuid())
        .bind(&device.brand)
        .bind(&device.model)
        .bind(&device.serial_number)
        .bind(device.status.as_str())
        .bind(device.price)
        .bind(device.owner_id.as_uuid())
        .bind(device.assignee_id.map(|id| *id.as_uuid()))
        .bind(device.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict(format!(
                    "Device with serial number {} already exists",
                    device.serial_number
                ))
            } else {
                map_sqlx_error("create_device", e)
            }
        })?;

        Ok(device)
    }

    async fn list_devices(&self) -> StoreResult<Vec<Device>> {
        let rows = sqlx::query(
            r#"
            SELECT id, brand, model, serial_number, status, price, owner_id, assignee_id, created_at
            FROM devices
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_devices", e))?;

        rows.iter()
            .map(|row| DeviceRow::from_row(row).map_err(row_decode)?.into_device())
            .collect()
    }

    async fn get_device(&self, id: DeviceId) -> StoreResult<Device> {
        let row = sqlx::query(
            r#"
            SELECT id, brand, model, serial_number, status, price, owner_id, assignee_id, created_at
            FROM devices
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_device", e))?
        .ok_or_else(|| StoreError::not_found(Entity::Device, id))?;

        DeviceRow::from_row(&row).map_err(row_decode)?.into_device()
    }

    async fn update_device(&self, id: DeviceId, update: DeviceUpdate) -> StoreResult<Device> {
        update.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let exists = sqlx::query("SELECT 1 AS hit FROM devices WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_device", e))?;
        if exists.is_none() {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::not_found(Entity::Device, id));
        }

        if let Some(customer_id) = update.customer_id {
            let owner = sqlx::query("SELECT 1 AS hit FROM users WHERE id = $1 AND role = $2")
                .bind(customer_id.as_uuid())
                .bind(UserRole::Customer.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_device", e))?;
            if owner.is_none() {
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::not_found(Entity::Customer, customer_id));
            }
        }

        let serial = update.serial_number.clone();
        let row = sqlx::query(
            r#"
            UPDATE devices
            SET brand = COALESCE($2, brand),
                model = COALESCE($3, model),
                serial_number = COALESCE($4, serial_number),
                status = COALESCE($5, status),
                price = COALESCE($6, price),
                owner_id = COALESCE($7, owner_id)
            WHERE id = $1
            RETURNING id, brand, model, serial_number, status, price, owner_id, assignee_id, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.brand)
        .bind(update.model)
        .bind(update.serial_number)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.price)
        .bind(update.customer_id.map(|id| *id.as_uuid()))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict(format!(
                    "Device with serial number {} already exists",
                    serial.as_deref().unwrap_or("?")
                ))
            } else {
                map_sqlx_error("update_device", e)
            }
        })?;

        let device = DeviceRow::from_row(&row).map_err(row_decode)?.into_device()?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(device)
    }

    async fn delete_device(&self, id: DeviceId) -> StoreResult<()> {
        let has_tickets = sqlx::query("SELECT 1 AS hit FROM tickets WHERE device_id = $1 LIMIT 1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_device", e))?;
        if has_tickets.is_some() {
            return Err(StoreError::conflict("Device still has repair tickets"));
        }

        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_device", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Entity::Device, id));
        }
        Ok(())
    }

    // Tickets -----------------------------------------------------------

    async fn create_ticket(&self, new: NewTicket) -> StoreResult<Ticket> {
        new.validate()?;

        let device = sqlx::query("SELECT 1 AS hit FROM devices WHERE id = $1")
            .bind(new.device_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_ticket", e))?;
        if device.is_none() {
            return Err(StoreError::not_found(Entity::Device, new.device_id));
        }

        let ticket = Ticket {
            id: TicketId::new(),
            device_id: new.device_id,
            issue_description: new.issue_description,
            status: new.status.unwrap_or(TicketStatus::Open),
            priority: new.priority.unwrap_or(TicketPriority::Medium),
            estimated_cost: new.estimated_cost,
            due_date: new.due_date,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO tickets (id, device_id, issue_description, status, priority, estimated_cost, due_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(ticket.id.as_uuid())
        .bind(ticket.device_id.as_uuid())
        .bind(&ticket.issue_description)
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(ticket.estimated_cost)
        .bind(ticket.due_date)
        .bind(ticket.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_ticket", e))?;

        Ok(ticket)
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        let rows = sqlx::query(
            r#"
            SELECT id, device_id, issue_description, status, priority, estimated_cost, due_date, created_at
            FROM tickets
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_tickets", e))?;

        rows.iter()
            .map(|row| TicketRow::from_row(row).map_err(row_decode)?.into_ticket())
            .collect()
    }

    async fn get_ticket(&self, id: TicketId) -> StoreResult<Ticket> {
        let row = sqlx::query(
            r#"
            SELECT id, device_id, issue_description, status, priority, estimated_cost, due_date, created_at
            FROM tickets
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_ticket", e))?
        .ok_or_else(|| StoreError::not_found(Entity::Ticket, id))?;

        TicketRow::from_row(&row).map_err(row_decode)?.into_ticket()
    }

    async fn update_ticket(&self, id: TicketId, update: TicketUpdate) -> StoreResult<Ticket> {
        update.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let exists = sqlx::query("SELECT 1 AS hit FROM tickets WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_ticket", e))?;
        if exists.is_none() {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::not_found(Entity::Ticket, id));
        }

        if let Some(device_id) = update.device_id {
            let device = sqlx::query("SELECT 1 AS hit FROM devices WHERE id = $1")
                .bind(device_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_ticket", e))?;
            if device.is_none() {
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::not_found(Entity::Device, device_id));
            }
        }

        // `due_date` distinguishes "leave alone" (outer None) from "clear"
        // (inner None), so it cannot ride the COALESCE pattern.
        let row = sqlx::query(
            r#"
            UPDATE tickets
            SET device_id = COALESCE($2, device_id),
                issue_description = COALESCE($3, issue_description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                estimated_cost = COALESCE($6, estimated_cost),
                due_date = CASE WHEN $7 THEN $8::timestamptz ELSE due_date END
            WHERE id = $1
            RETURNING id, device_id, issue_description, status, priority, estimated_cost, due_date, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.device_id.map(|id| *id.as_uuid()))
        .bind(update.issue_description)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.priority.map(|p| p.as_str()))
        .bind(update.estimated_cost)
        .bind(update.due_date.is_some())
        .bind(update.due_date.flatten())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_ticket", e))?;

        let ticket = TicketRow::from_row(&row).map_err(row_decode)?.into_ticket()?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(ticket)
    }

    async fn delete_ticket(&self, id: TicketId) -> StoreResult<()> {
        let has_parts = sqlx::query("SELECT 1 AS hit FROM ticket_parts WHERE ticket_id = $1 LIMIT 1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_ticket", e))?;
        if has_parts.is_some() {
            return Err(StoreError::conflict(
                "Ticket still has parts attached; detach them first",
            ));
        }

        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_ticket", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Entity::Ticket, id));
        }
        Ok(())
    }

    // Parts -------------------------------------------------------------

    async fn create_part(&self, new: NewPart) -> StoreResult<Part> {
        new.validate()?;

        let part = Part {
            id: PartId::new(),
            name: new.name,
            sku: new.sku,
            stock_quantity: new.stock_quantity,
            price: new.price,
            cost: new.cost,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO parts (id, name, sku, stock_quantity, price, cost, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(part.id.as_uuid())
        .bind(&part.name)
        .bind(&part.sku)
        .bind(part.stock_quantity)
        .bind(part.price)
        .bind(part.cost)
        .bind(part.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict(format!(
                    "Part with SKU {} already exists",
                    part.sku.as_deref().unwrap_or("?")
                ))
            } else {
                map_sqlx_error("create_part", e)
            }
        })?;

        Ok(part)
    }

    async fn list_parts(&self) -> StoreResult<Vec<Part>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, sku, stock_quantity, price, cost, created_at
            FROM parts
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_parts", e))?;

        rows.iter()
            .map(|row| PartRow::from_row(row).map_err(row_decode).map(PartRow::into_part))
            .collect()
    }

    async fn get_part(&self, id: PartId) -> StoreResult<Part> {
        let row = sqlx::query(
            "SELECT id, name, sku, stock_quantity, price, cost, created_at FROM parts WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_part", e))?
        .ok_or_else(|| StoreError::not_found(Entity::Part, id))?;

        Ok(PartRow::from_row(&row).map_err(row_decode)?.into_part())
    }

    async fn update_part(&self, id: PartId, update: PartUpdate) -> StoreResult<Part> {
        update.validate()?;

        let sku = update.sku.clone();
        let row = sqlx::query(
            r#"
            UPDATE parts
            SET name = COALESCE($2, name),
                sku = COALESCE($3, sku),
                stock_quantity = COALESCE($4, stock_quantity),
                price = COALESCE($5, price),
                cost = COALESCE($6, cost)
            WHERE id = $1
            RETURNING id, name, sku, stock_quantity, price, cost, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.name)
        .bind(update.sku)
        .bind(update.stock_quantity)
        .bind(update.price)
        .bind(update.cost)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict(format!(
                    "Part with SKU {} already exists",
                    sku.as_deref().unwrap_or("?")
                ))
            } else {
                map_sqlx_error("update_part", e)
            }
        })?
        .ok_or_else(|| StoreError::not_found(Entity::Part, id))?;

        Ok(PartRow::from_row(&row).map_err(row_decode)?.into_part())
    }

    async fn delete_part(&self, id: PartId) -> StoreResult<()> {
        let attached = sqlx::query("SELECT 1 AS hit FROM ticket_parts WHERE part_id = $1 LIMIT 1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_part", e))?;
        if attached.is_some() {
            return Err(StoreError::conflict(
                "Part is still attached to tickets; detach it first",
            ));
        }

        let result = sqlx::query("DELETE FROM parts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_part", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Entity::Part, id));
        }
        Ok(())
    }

    // Inventory ledger --------------------------------------------------

    /// Attach a part to a ticket, consuming stock.
    ///
    /// The part row is locked (`FOR UPDATE`) before the stock guard runs, so
    /// concurrent attaches on the same part serialize. Any failure rolls the
    /// transaction back with zero side effects.
    #[instrument(skip(self), fields(%ticket_id, %part_id, quantity), err)]
    async fn attach_part(
        &self,
        ticket_id: TicketId,
        part_id: PartId,
        quantity: i64,
    ) -> StoreResult<TicketPartDetail> {
        validate_requested_quantity(quantity)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let ticket_row = sqlx::query(
            "SELECT id, issue_description, status FROM tickets WHERE id = $1",
        )
        .bind(ticket_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("attach_part", e))?;
        let Some(ticket_row) = ticket_row else {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::not_found(Entity::Ticket, ticket_id));
        };
        let ticket = TicketSummaryRow::from_row(&ticket_row)
            .map_err(row_decode)?
            .into_summary()?;

        let part_row = sqlx::query(
            r#"
            SELECT id, name, sku, stock_quantity, price, cost, created_at
            FROM parts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(part_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("attach_part", e))?;
        let Some(part_row) = part_row else {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::not_found(Entity::Part, part_id));
        };
        let part = PartRow::from_row(&part_row).map_err(row_decode)?.into_part();

        if let Err(short) = check_stock(part.stock_quantity, quantity) {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(short.into());
        }

        sqlx::query("UPDATE parts SET stock_quantity = stock_quantity - $2 WHERE id = $1")
            .bind(part_id.as_uuid())
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("attach_part", e))?;

        // The part row lock covers the pair row too: nothing else can be
        // inside this section for the same part.
        let existing = sqlx::query(
            "SELECT id, quantity, created_at FROM ticket_parts WHERE ticket_id = $1 AND part_id = $2",
        )
        .bind(ticket_id.as_uuid())
        .bind(part_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("attach_part", e))?;

        let record = match existing {
            Some(row) => {
                let existing_id: uuid::Uuid = row.try_get("id").map_err(row_decode)?;
                let existing_qty: i64 = row.try_get("quantity").map_err(row_decode)?;
                let created_at: DateTime<Utc> = row.try_get("created_at").map_err(row_decode)?;

                sqlx::query("UPDATE ticket_parts SET quantity = quantity + $2 WHERE id = $1")
                    .bind(existing_id)
                    .bind(quantity)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("attach_part", e))?;

                TicketPart {
                    id: TicketPartId::from_uuid(existing_id),
                    ticket_id,
                    part_id,
                    quantity: existing_qty + quantity,
                    created_at,
                }
            }
            None => {
                let record = TicketPart {
                    id: TicketPartId::new(),
                    ticket_id,
                    part_id,
                    quantity,
                    created_at: Utc::now(),
                };
                sqlx::query(
                    r#"
                    INSERT INTO ticket_parts (id, ticket_id, part_id, quantity, created_at)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(record.id.as_uuid())
                .bind(ticket_id.as_uuid())
                .bind(part_id.as_uuid())
                .bind(record.quantity)
                .bind(record.created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("attach_part", e))?;
                record
            }
        };

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;

        Ok(TicketPartDetail {
            record,
            ticket,
            part: PartSummary {
                id: part.id,
                name: part.name,
                sku: part.sku,
                stock_quantity: part.stock_quantity - quantity,
                price: part.price,
            },
        })
    }

    /// Detach a ledger row, restoring its full quantity to part stock.
    #[instrument(skip(self), fields(%id), err)]
    async fn detach_part(&self, id: TicketPartId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let row = sqlx::query(
            "SELECT part_id, quantity FROM ticket_parts WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("detach_part", e))?;
        let Some(row) = row else {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::not_found(Entity::TicketPart, id));
        };
        let part_id: uuid::Uuid = row.try_get("part_id").map_err(row_decode)?;
        let quantity: i64 = row.try_get("quantity").map_err(row_decode)?;

        sqlx::query("UPDATE parts SET stock_quantity = stock_quantity + $2 WHERE id = $1")
            .bind(part_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("detach_part", e))?;

        sqlx::query("DELETE FROM ticket_parts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("detach_part", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    async fn list_ticket_parts(&self) -> StoreResult<Vec<TicketPartDetail>> {
        let rows = sqlx::query(&detail_query(None))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_ticket_parts", e))?;

        rows.iter()
            .map(|row| DetailRow::from_row(row).map_err(row_decode)?.into_detail())
            .collect()
    }

    async fn list_ticket_parts_for_ticket(
        &self,
        ticket_id: TicketId,
    ) -> StoreResult<Vec<TicketPartDetail>> {
        let ticket = sqlx::query("SELECT 1 AS hit FROM tickets WHERE id = $1")
            .bind(ticket_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_ticket_parts_for_ticket", e))?;
        if ticket.is_none() {
            return Err(StoreError::not_found(Entity::Ticket, ticket_id));
        }

        let rows = sqlx::query(&detail_query(Some("tp.ticket_id = $1")))
            .bind(ticket_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_ticket_parts_for_ticket", e))?;

        rows.iter()
            .map(|row| DetailRow::from_row(row).map_err(row_decode)?.into_detail())
            .collect()
    }

    async fn get_ticket_part(&self, id: TicketPartId) -> StoreResult<TicketPartDetail> {
        let row = sqlx::query(&detail_query(Some("tp.id = $1")))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_ticket_part", e))?
            .ok_or_else(|| StoreError::not_found(Entity::TicketPart, id))?;

        DetailRow::from_row(&row).map_err(row_decode)?.into_detail()
    }
}

/// Ledger detail query: the ledger row joined with its ticket and part
/// summaries, newest first.
fn detail_query(filter: Option<&str>) -> String {
    let where_clause = filter.map(|f| format!("WHERE {f}")).unwrap_or_default();
    format!(
        r#"
        SELECT
            tp.id, tp.ticket_id, tp.part_id, tp.quantity, tp.created_at,
            t.issue_description, t.status AS ticket_status,
            p.name AS part_name, p.sku, p.stock_quantity, p.price
        FROM ticket_parts tp
        JOIN tickets t ON t.id = tp.ticket_id
        JOIN parts p ON p.id = tp.part_id
        {where_clause}
        ORDER BY tp.created_at DESC
        "#
    )
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Invalid(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn row_decode(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row: {err}"))
}

// SQLx row types

#[derive(Debug)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for UserRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            role: row.try_get("role")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl UserRow {
    fn into_user(self) -> StoreResult<User> {
        let role: UserRole = self
            .role
            .parse()
            .map_err(|_| StoreError::backend(format!("invalid role in users row: {}", self.role)))?;
        Ok(User {
            id: UserId::from_uuid(self.id),
            email: self.email,
            name: self.name,
            role,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug)]
struct CredentialsRow {
    user: UserRow,
    password_hash: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for CredentialsRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(CredentialsRow {
            user: UserRow::from_row(row)?,
            password_hash: row.try_get("password_hash")?,
        })
    }
}

impl CredentialsRow {
    fn into_credentials(self) -> StoreResult<UserCredentials> {
        Ok(UserCredentials {
            user: self.user.into_user()?,
            password_hash: self.password_hash,
        })
    }
}

#[derive(Debug)]
struct DeviceRow {
    id: uuid::Uuid,
    brand: String,
    model: String,
    serial_number: String,
    status: String,
    price: f64,
    owner_id: uuid::Uuid,
    assignee_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for DeviceRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(DeviceRow {
            id: row.try_get("id")?,
            brand: row.try_get("brand")?,
            model: row.try_get("model")?,
            serial_number: row.try_get("serial_number")?,
            status: row.try_get("status")?,
            price: row.try_get("price")?,
            owner_id: row.try_get("owner_id")?,
            assignee_id: row.try_get("assignee_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl DeviceRow {
    fn into_device(self) -> StoreResult<Device> {
        let status: DeviceStatus = self.status.parse().map_err(|_| {
            StoreError::backend(format!("invalid status in devices row: {}", self.status))
        })?;
        Ok(Device {
            id: DeviceId::from_uuid(self.id),
            brand: self.brand,
            model: self.model,
            serial_number: self.serial_number,
            status,
            price: self.price,
            owner_id: UserId::from_uuid(self.owner_id),
            assignee_id: self.assignee_id.map(UserId::from_uuid),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug)]
struct TicketRow {
    id: uuid::Uuid,
    device_id: uuid::Uuid,
    issue_description: String,
    status: String,
    priority: String,
    estimated_cost: Option<f64>,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for TicketRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(TicketRow {
            id: row.try_get("id")?,
            device_id: row.try_get("device_id")?,
            issue_description: row.try_get("issue_description")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            estimated_cost: row.try_get("estimated_cost")?,
            due_date: row.try_get("due_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TicketRow {
    fn into_ticket(self) -> StoreResult<Ticket> {
        let status: TicketStatus = self.status.parse().map_err(|_| {
            StoreError::backend(format!("invalid status in tickets row: {}", self.status))
        })?;
        let priority: TicketPriority = self.priority.parse().map_err(|_| {
            StoreError::backend(format!("invalid priority in tickets row: {}", self.priority))
        })?;
        Ok(Ticket {
            id: TicketId::from_uuid(self.id),
            device_id: DeviceId::from_uuid(self.device_id),
            issue_description: self.issue_description,
            status,
            priority,
            estimated_cost: self.estimated_cost,
            due_date: self.due_date,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug)]
struct PartRow {
    id: uuid::Uuid,
    name: String,
    sku: Option<String>,
    stock_quantity: i64,
    price: f64,
    cost: f64,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PartRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PartRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            stock_quantity: row.try_get("stock_quantity")?,
            price: row.try_get("price")?,
            cost: row.try_get("cost")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PartRow {
    fn into_part(self) -> Part {
        Part {
            id: PartId::from_uuid(self.id),
            name: self.name,
            sku: self.sku,
            stock_quantity: self.stock_quantity,
            price: self.price,
            cost: self.cost,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug)]
struct TicketSummaryRow {
    id: uuid::Uuid,
    issue_description: String,
    status: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for TicketSummaryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(TicketSummaryRow {
            id: row.try_get("id")?,
            issue_description: row.try_get("issue_description")?,
            status: row.try_get("status")?,
        })
    }
}

impl TicketSummaryRow {
    fn into_summary(self) -> StoreResult<TicketSummary> {
        let status: TicketStatus = self.status.parse().map_err(|_| {
            StoreError::backend(format!("invalid status in tickets row: {}", self.status))
        })?;
        Ok(TicketSummary {
            id: TicketId::from_uuid(self.id),
            issue_description: self.issue_description,
            status,
        })
    }
}

#[derive(Debug)]
struct DetailRow {
    id: uuid::Uuid,
    ticket_id: uuid::Uuid,
    part_id: uuid::Uuid,
    quantity: i64,
    created_at: DateTime<Utc>,
    issue_description: String,
    ticket_status: String,
    part_name: String,
    sku: Option<String>,
    stock_quantity: i64,
    price: f64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for DetailRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(DetailRow {
            id: row.try_get("id")?,
            ticket_id: row.try_get("ticket_id")?,
            part_id: row.try_get("part_id")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            issue_description: row.try_get("issue_description")?,
            ticket_status: row.try_get("ticket_status")?,
            part_name: row.try_get("part_name")?,
            sku: row.try_get("sku")?,
            stock_quantity: row.try_get("stock_quantity")?,
            price: row.try_get("price")?,
        })
    }
}

impl DetailRow {
    fn into_detail(self) -> StoreResult<TicketPartDetail> {
        let status: TicketStatus = self.ticket_status.parse().map_err(|_| {
            StoreError::backend(format!(
                "invalid status in tickets row: {}",
                self.ticket_status
            ))
        })?;
        Ok(TicketPartDetail {
            record: TicketPart {
                id: TicketPartId::from_uuid(self.id),
                ticket_id: TicketId::from_uuid(self.ticket_id),
                part_id: PartId::from_uuid(self.part_id),
                quantity: self.quantity,
                created_at: self.created_at,
            },
            ticket: TicketSummary {
                id: TicketId::from_uuid(self.ticket_id),
                issue_description: self.issue_description,
                status,
            },
            part: PartSummary {
                id: PartId::from_uuid(self.part_id),
                name: self.part_name,
                sku: self.sku,
                stock_quantity: self.stock_quantity,
                price: self.price,
            },
        })
    }
}
