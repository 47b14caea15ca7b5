use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use fixtrack_auth::UserRole;
use fixtrack_core::{TicketId, TicketPartId};
use fixtrack_inventory::TicketPartDetail;

use crate::app::state::AppState;
use crate::app::{dto, errors};
use crate::authz::require_role;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_ticket_parts).post(attach_part))
        .route("/ticket/:ticket_id", get(list_for_ticket))
        .route("/:id", get(get_ticket_part).delete(detach_part))
}

/// Attach a part to a ticket, consuming stock atomically.
pub async fn attach_part(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<dto::AttachPartRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager, UserRole::Technician]) {
        return resp;
    }

    match state
        .store
        .attach_part(body.ticket_id, body.part_id, body.quantity)
        .await
    {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_ticket_parts(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager, UserRole::Technician]) {
        return resp;
    }

    match state.store.list_ticket_parts().await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Parts consumed by one ticket. Customers may read this; the payload
/// carries the part join only, not the ticket summary.
pub async fn list_for_ticket(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(ticket_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(
        &user,
        &[UserRole::Manager, UserRole::Technician, UserRole::Customer],
    ) {
        return resp;
    }

    let ticket_id: TicketId = match ticket_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid ticket id")
        }
    };

    match state.store.list_ticket_parts_for_ticket(ticket_id).await {
        Ok(rows) => {
            let body: Vec<serde_json::Value> = rows.iter().map(ticket_scoped_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_ticket_part(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager, UserRole::Technician]) {
        return resp;
    }

    let id: TicketPartId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid ticket part id")
        }
    };

    match state.store.get_ticket_part(id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Detach a ledger row, restoring its quantity to stock.
pub async fn detach_part(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager, UserRole::Technician]) {
        return resp;
    }

    let id: TicketPartId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid ticket part id")
        }
    };

    match state.store.detach_part(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

fn ticket_scoped_json(detail: &TicketPartDetail) -> serde_json::Value {
    let mut value = serde_json::to_value(&detail.record).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "part".to_string(),
            serde_json::to_value(&detail.part).unwrap_or_default(),
        );
    }
    value
}
