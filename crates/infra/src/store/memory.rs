//! In-memory store (dev/test wiring).
//!
//! A single mutex guards all tables, so every ledger operation is trivially
//! atomic and attaches on the same part serialize exactly as the Postgres
//! row lock makes them. Not intended for production use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

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

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, StoredUser>,
    devices: HashMap<DeviceId, Device>,
    tickets: HashMap<TicketId, Ticket>,
    parts: HashMap<PartId, Part>,
    ticket_parts: HashMap<TicketPartId, TicketPart>,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|s| s.user.email == email && Some(s.user.id) != except)
    }

    fn serial_taken(&self, serial: &str, except: Option<DeviceId>) -> bool {
        self.devices
            .values()
            .any(|d| d.serial_number == serial && Some(d.id) != except)
    }

    fn sku_taken(&self, sku: &str, except: Option<PartId>) -> bool {
        self.parts
            .values()
            .any(|p| p.sku.as_deref() == Some(sku) && Some(p.id) != except)
    }

    fn customer(&self, id: UserId) -> StoreResult<&User> {
        self.users
            .get(&id)
            .map(|s| &s.user)
            .filter(|u| u.role == UserRole::Customer)
            .ok_or_else(|| StoreError::not_found(Entity::Customer, id))
    }

    fn pair_row(&self, ticket_id: TicketId, part_id: PartId) -> Option<TicketPartId> {
        self.ticket_parts
            .values()
            .find(|tp| tp.ticket_id == ticket_id && tp.part_id == part_id)
            .map(|tp| tp.id)
    }

    fn detail(&self, record: &TicketPart) -> StoreResult<TicketPartDetail> {
        let ticket = self
            .tickets
            .get(&record.ticket_id)
            .ok_or_else(|| StoreError::backend("ticket_part references missing ticket"))?;
        let part = self
            .parts
            .get(&record.part_id)
            .ok_or_else(|| StoreError::backend("ticket_part references missing part"))?;
        Ok(TicketPartDetail {
            record: record.clone(),
            ticket: TicketSummary {
                id: ticket.id,
                issue_description: ticket.issue_description.clone(),
                status: ticket.status,
            },
            part: PartSummary {
                id: part.id,
                name: part.name.clone(),
                sku: part.sku.clone(),
                stock_quantity: part.stock_quantity,
                price: part.price,
            },
        })
    }
}

/// Mutex-guarded store over plain maps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    // Users ------------------------------------------------------------

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        new.validate()?;
        let mut s = self.state.lock().unwrap();
        if s.email_taken(&new.email, None) {
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
        s.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let s = self.state.lock().unwrap();
        let mut users: Vec<User> = s.users.values().map(|u| u.user.clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        let s = self.state.lock().unwrap();
        s.users
            .get(&id)
            .map(|u| u.user.clone())
            .ok_or_else(|| StoreError::not_found(Entity::User, id))
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        let s = self.state.lock().unwrap();
        Ok(s.users.values().find(|u| u.user.email == email).map(|u| {
            UserCredentials {
                user: u.user.clone(),
                password_hash: u.password_hash.clone(),
            }
        }))
    }

    // Customers ---------------------------------------------------------

    async fn list_customers(&self) -> StoreResult<Vec<User>> {
        let s = self.state.lock().unwrap();
        let mut customers: Vec<User> = s
            .users
            .values()
            .map(|u| u.user.clone())
            .filter(|u| u.role == UserRole::Customer)
            .collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(customers)
    }

    async fn get_customer(&self, id: UserId) -> StoreResult<User> {
        let s = self.state.lock().unwrap();
        s.customer(id).cloned()
    }

    async fn update_customer(&self, id: UserId, update: UserUpdate) -> StoreResult<User> {
        update.validate()?;
        let mut s = self.state.lock().unwrap();
        s.customer(id)?;
        if let Some(email) = &update.email {
            if s.email_taken(email, Some(id)) {
                return Err(StoreError::conflict(format!(
                    "User with email {email} already exists"
                )));
            }
        }
        let stored = s.users.get_mut(&id).expect("checked above");
        if let Some(email) = update.email {
            stored.user.email = email;
        }
        if let Some(hash) = update.password_hash {
            stored.password_hash = hash;
        }
        Ok(stored.user.clone())
    }

    async fn delete_customer(&self, id: UserId) -> StoreResult<()> {
        let mut s = self.state.lock().unwrap();
        s.customer(id)?;
        if s.devices.values().any(|d| d.owner_id == id) {
            return Err(StoreError::conflict(
                "Customer still owns registered devices",
            ));
        }
        s.users.remove(&id);
        Ok(())
    }

    // Devices -----------------------------------------------------------

    async fn create_device(&self, new: NewDevice) -> StoreResult<Device> {
        new.validate()?;
        let mut s = self.state.lock().unwrap();
        s.customer(new.customer_id)?;
        if s.serial_taken(&new.serial_number, None) {
            return Err(StoreError::conflict(format!(
                "Device with serial number {} already exists",
                new.serial_number
            )));
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
        s.devices.insert(device.id, device.clone());
        Ok(device)
    }

    async fn list_devices(&self) -> StoreResult<Vec<Device>> {
        let s = self.state.lock().unwrap();
        let mut devices: Vec<Device> = s.devices.values().cloned().collect();
        devices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(devices)
    }

    async fn get_device(&self, id: DeviceId) -> StoreResult<Device> {
        let s = self.state.lock().unwrap();
        s.devices
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Device, id))
    }

    async fn update_device(&self, id: DeviceId, update: DeviceUpdate) -> StoreResult<Device> {
        update.validate()?;
        let mut s = self.state.lock().unwrap();
        if !s.devices.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Device, id));
        }
        if let Some(serial) = &update.serial_number {
            if s.serial_taken(serial, Some(id)) {
                return Err(StoreError::conflict(format!(
                    "Device with serial number {serial} already exists"
                )));
            }
        }
        if let Some(customer_id) = update.customer_id {
            s.customer(customer_id)?;
        }
        let device = s.devices.get_mut(&id).expect("checked above");
        if let Some(brand) = update.brand {
            device.brand = brand;
        }
        if let Some(model) = update.model {
            device.model = model;
        }
        if let Some(serial) = update.serial_number {
            device.serial_number = serial;
        }
        if let Some(status) = update.status {
            device.status = status;
        }
        if let Some(price) = update.price {
            device.price = price;
        }
        if let Some(customer_id) = update.customer_id {
            device.owner_id = customer_id;
        }
        Ok(device.clone())
    }

    async fn delete_device(&self, id: DeviceId) -> StoreResult<()> {
        let mut s = self.state.lock().unwrap();
        if !s.devices.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Device, id));
        }
        if s.tickets.values().any(|t| t.device_id == id) {
            return Err(StoreError::conflict("Device still has repair tickets"));
        }
        s.devices.remove(&id);
        Ok(())
    }

    // Tickets -----------------------------------------------------------

    async fn create_ticket(&self, new: NewTicket) -> StoreResult<Ticket> {
        new.validate()?;
        let mut s = self.state.lock().unwrap();
        if !s.devices.contains_key(&new.device_id) {
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
        s.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        let s = self.state.lock().unwrap();
        let mut tickets: Vec<Ticket> = s.tickets.values().cloned().collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn get_ticket(&self, id: TicketId) -> StoreResult<Ticket> {
        let s = self.state.lock().unwrap();
        s.tickets
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Ticket, id))
    }

    async fn update_ticket(&self, id: TicketId, update: TicketUpdate) -> StoreResult<Ticket> {
        update.validate()?;
        let mut s = self.state.lock().unwrap();
        if !s.tickets.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Ticket, id));
        }
        if let Some(device_id) = update.device_id {
            if !s.devices.contains_key(&device_id) {
                return Err(StoreError::not_found(Entity::Device, device_id));
            }
        }
        let ticket = s.tickets.get_mut(&id).expect("checked above");
        if let Some(device_id) = update.device_id {
            ticket.device_id = device_id;
        }
        if let Some(desc) = update.issue_description {
            ticket.issue_description = desc;
        }
        if let Some(status) = update.status {
            ticket.status = status;
        }
        if let Some(priority) = update.priority {
            ticket.priority = priority;
        }
        if let Some(cost) = update.estimated_cost {
            ticket.estimated_cost = Some(cost);
        }
        if let Some(due) = update.due_date {
            ticket.due_date = due;
        }
        Ok(ticket.clone())
    }

    async fn delete_ticket(&self, id: TicketId) -> StoreResult<()> {
        let mut s = self.state.lock().unwrap();
        if !s.tickets.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Ticket, id));
        }
        if s.ticket_parts.values().any(|tp| tp.ticket_id == id) {
            return Err(StoreError::conflict(
                "Ticket still has parts attached; detach them first",
            ));
        }
        s.tickets.remove(&id);
        Ok(())
    }

    // Parts -------------------------------------------------------------

    async fn create_part(&self, new: NewPart) -> StoreResult<Part> {
        new.validate()?;
        let mut s = self.state.lock().unwrap();
        if let Some(sku) = &new.sku {
            if s.sku_taken(sku, None) {
                return Err(StoreError::conflict(format!(
                    "Part with SKU {sku} already exists"
                )));
            }
        }
        let part = Part {
            id: PartId::new(),
            name: new.name,
            sku: new.sku,
            stock_quantity: new.stock_quantity,
            price: new.price,
            cost: new.cost,
            created_at: Utc::now(),
        };
        s.parts.insert(part.id, part.clone());
        Ok(part)
    }

    async fn list_parts(&self) -> StoreResult<Vec<Part>> {
        let s = self.state.lock().unwrap();
        let mut parts: Vec<Part> = s.parts.values().cloned().collect();
        parts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(parts)
    }

    async fn get_part(&self, id: PartId) -> StoreResult<Part> {
        let s = self.state.lock().unwrap();
        s.parts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Part, id))
    }

    async fn update_part(&self, id: PartId, update: PartUpdate) -> StoreResult<Part> {
        update.validate()?;
        let mut s = self.state.lock().unwrap();
        if !s.parts.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Part, id));
        }
        if let Some(sku) = &update.sku {
            if s.sku_taken(sku, Some(id)) {
                return Err(StoreError::conflict(format!(
                    "Part with SKU {sku} already exists"
                )));
            }
        }
        let part = s.parts.get_mut(&id).expect("checked above");
        if let Some(name) = update.name {
            part.name = name;
        }
        if let Some(sku) = update.sku {
            part.sku = Some(sku);
        }
        if let Some(qty) = update.stock_quantity {
            part.stock_quantity = qty;
        }
        if let Some(price) = update.price {
            part.price = price;
        }
        if let Some(cost) = update.cost {
            part.cost = cost;
        }
        Ok(part.clone())
    }

    async fn delete_part(&self, id: PartId) -> StoreResult<()> {
        let mut s = self.state.lock().unwrap();
        if !s.parts.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Part, id));
        }
        if s.ticket_parts.values().any(|tp| tp.part_id == id) {
            return Err(StoreError::conflict(
                "Part is still attached to tickets; detach it first",
            ));
        }
        s.parts.remove(&id);
        Ok(())
    }

    // Inventory ledger --------------------------------------------------

    async fn attach_part(
        &self,
        ticket_id: TicketId,
        part_id: PartId,
        quantity: i64,
    ) -> StoreResult<TicketPartDetail> {
        validate_requested_quantity(quantity)?;
        let mut s = self.state.lock().unwrap();

        if !s.tickets.contains_key(&ticket_id) {
            return Err(StoreError::not_found(Entity::Ticket, ticket_id));
        }
        let part = s
            .parts
            .get(&part_id)
            .ok_or_else(|| StoreError::not_found(Entity::Part, part_id))?;

        // Guard before any write; the stored balance is already net of prior
        // reservations for this pair.
        check_stock(part.stock_quantity, quantity)?;

        let part = s.parts.get_mut(&part_id).expect("checked above");
        part.stock_quantity -= quantity;

        let record = match s.pair_row(ticket_id, part_id) {
            Some(existing_id) => {
                let row = s
                    .ticket_parts
                    .get_mut(&existing_id)
                    .expect("pair index points at live row");
                row.quantity += quantity;
                row.clone()
            }
            None => {
                let row = TicketPart {
                    id: TicketPartId::new(),
                    ticket_id,
                    part_id,
                    quantity,
                    created_at: Utc::now(),
                };
                s.ticket_parts.insert(row.id, row.clone());
                row
            }
        };

        s.detail(&record)
    }

    async fn detach_part(&self, id: TicketPartId) -> StoreResult<()> {
        let mut s = self.state.lock().unwrap();
        let record = s
            .ticket_parts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::TicketPart, id))?;

        if let Some(part) = s.parts.get_mut(&record.part_id) {
            part.stock_quantity += record.quantity;
        }
        s.ticket_parts.remove(&id);
        Ok(())
    }

    async fn list_ticket_parts(&self) -> StoreResult<Vec<TicketPartDetail>> {
        let s = self.state.lock().unwrap();
        let mut rows: Vec<TicketPart> = s.ticket_parts.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.iter().map(|r| s.detail(r)).collect()
    }

    async fn list_ticket_parts_for_ticket(
        &self,
        ticket_id: TicketId,
    ) -> StoreResult<Vec<TicketPartDetail>> {
        let s = self.state.lock().unwrap();
        if !s.tickets.contains_key(&ticket_id) {
            return Err(StoreError::not_found(Entity::Ticket, ticket_id));
        }
        let mut rows: Vec<TicketPart> = s
            .ticket_parts
            .values()
            .filter(|tp| tp.ticket_id == ticket_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.iter().map(|r| s.detail(r)).collect()
    }

    async fn get_ticket_part(&self, id: TicketPartId) -> StoreResult<TicketPartDetail> {
        let s = self.state.lock().unwrap();
        let record = s
            .ticket_parts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::TicketPart, id))?;
        s.detail(&record)
    }
}
