use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use fixtrack_auth::UserRole;
use fixtrack_core::PartId;
use fixtrack_inventory::{NewPart, PartUpdate};

use crate::app::state::AppState;
use crate::app::{dto, errors};
use crate::authz::require_role;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_parts).post(create_part))
        .route("/:id", get(get_part).patch(update_part).delete(delete_part))
}

pub async fn create_part(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<dto::CreatePartRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    match state
        .store
        .create_part(NewPart {
            name: body.name,
            sku: body.sku,
            stock_quantity: body.stock_quantity,
            price: body.price.unwrap_or(0.0),
            cost: body.cost.unwrap_or(0.0),
        })
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_parts(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager, UserRole::Technician]) {
        return resp;
    }

    match state.store.list_parts().await {
        Ok(parts) => (StatusCode::OK, Json(parts)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_part(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager, UserRole::Technician]) {
        return resp;
    }

    let id: PartId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid part id"),
    };

    match state.store.get_part(id).await {
        Ok(found) => (StatusCode::OK, Json(found)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_part(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdatePartRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    let id: PartId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid part id"),
    };

    let update = PartUpdate {
        name: body.name,
        sku: body.sku,
        stock_quantity: body.stock_quantity,
        price: body.price,
        cost: body.cost,
    };

    match state.store.update_part(id, update).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_part(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    let id: PartId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid part id"),
    };

    match state.store.delete_part(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
