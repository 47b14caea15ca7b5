use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use fixtrack_auth::UserRole;
use fixtrack_core::TicketId;
use fixtrack_workshop::{NewTicket, TicketUpdate};

use crate::app::state::AppState;
use crate::app::{dto, errors};
use crate::authz::require_role;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route(
            "/:id",
            get(get_ticket).patch(update_ticket).delete(delete_ticket),
        )
}

pub async fn create_ticket(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<dto::CreateTicketRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager, UserRole::Customer]) {
        return resp;
    }

    match state
        .store
        .create_ticket(NewTicket {
            device_id: body.device_id,
            issue_description: body.issue_description,
            status: body.status,
            priority: body.priority,
            estimated_cost: body.estimated_cost,
            due_date: body.due_date,
        })
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_tickets(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(resp) = require_role(
        &user,
        &[UserRole::Manager, UserRole::Technician, UserRole::Customer],
    ) {
        return resp;
    }

    match state.store.list_tickets().await {
        Ok(tickets) => (StatusCode::OK, Json(tickets)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_ticket(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(
        &user,
        &[UserRole::Manager, UserRole::Technician, UserRole::Customer],
    ) {
        return resp;
    }

    let id: TicketId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid ticket id")
        }
    };

    match state.store.get_ticket(id).await {
        Ok(found) => (StatusCode::OK, Json(found)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_ticket(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateTicketRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager, UserRole::Technician]) {
        return resp;
    }

    let id: TicketId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid ticket id")
        }
    };

    let update = TicketUpdate {
        device_id: body.device_id,
        issue_description: body.issue_description,
        status: body.status,
        priority: body.priority,
        estimated_cost: body.estimated_cost,
        // Absent field leaves the due date alone; there is no wire syntax
        // for clearing it.
        due_date: body.due_date.map(Some),
    };

    match state.store.update_ticket(id, update).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_ticket(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    let id: TicketId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid ticket id")
        }
    };

    match state.store.delete_ticket(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
