//! Request DTOs (camelCase JSON, matching the response bodies).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use fixtrack_auth::UserRole;
use fixtrack_core::{DeviceId, PartId, TicketId, UserId};
use fixtrack_workshop::{DeviceStatus, TicketPriority, TicketStatus};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCustomerRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest {
    pub brand: String,
    pub model: String,
    pub serial_number: String,
    pub status: Option<DeviceStatus>,
    pub price: Option<f64>,
    pub customer_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeviceRequest {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<DeviceStatus>,
    pub price: Option<f64>,
    pub customer_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub device_id: DeviceId,
    pub issue_description: String,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub estimated_cost: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketRequest {
    pub device_id: Option<DeviceId>,
    pub issue_description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub estimated_cost: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartRequest {
    pub name: String,
    pub sku: Option<String>,
    pub stock_quantity: i64,
    pub price: Option<f64>,
    pub cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub stock_quantity: Option<i64>,
    pub price: Option<f64>,
    pub cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachPartRequest {
    pub ticket_id: TicketId,
    pub part_id: PartId,
    pub quantity: i64,
}
