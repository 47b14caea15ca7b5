use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use fixtrack_auth::UserRole;
use fixtrack_core::DeviceId;
use fixtrack_workshop::{DeviceUpdate, NewDevice};

use crate::app::state::AppState;
use crate::app::{dto, errors};
use crate::authz::require_role;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_devices).post(create_device))
        .route(
            "/:id",
            get(get_device).patch(update_device).delete(delete_device),
        )
}

pub async fn create_device(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<dto::CreateDeviceRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager, UserRole::Customer]) {
        return resp;
    }

    match state
        .store
        .create_device(NewDevice {
            brand: body.brand,
            model: body.model,
            serial_number: body.serial_number,
            status: body.status,
            price: body.price,
            customer_id: body.customer_id,
        })
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_devices(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(resp) = require_role(
        &user,
        &[UserRole::Manager, UserRole::Technician, UserRole::Customer],
    ) {
        return resp;
    }

    match state.store.list_devices().await {
        Ok(devices) => (StatusCode::OK, Json(devices)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_device(
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

    let id: DeviceId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid device id")
        }
    };

    match state.store.get_device(id).await {
        Ok(found) => (StatusCode::OK, Json(found)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_device(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateDeviceRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    let id: DeviceId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid device id")
        }
    };

    let update = DeviceUpdate {
        brand: body.brand,
        model: body.model,
        serial_number: body.serial_number,
        status: body.status,
        price: body.price,
        customer_id: body.customer_id,
    };

    match state.store.update_device(id, update).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_device(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    let id: DeviceId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid device id")
        }
    };

    match state.store.delete_device(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
