use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use fixtrack_auth::{hash_password, NewUser, UserRole, UserUpdate};
use fixtrack_core::UserId;

use crate::app::state::AppState;
use crate::app::{dto, errors};
use crate::authz::require_role;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register).get(list_customers))
        .route(
            "/:id",
            get(get_customer).patch(update_customer).delete(delete_customer),
        )
}

/// Customer self-registration. The only unauthenticated write in the API;
/// the role is fixed server-side.
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<dto::RegisterCustomerRequest>,
) -> axum::response::Response {
    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!(error = %e, "failed to hash password");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                "failed to hash password",
            );
        }
    };

    match state
        .store
        .create_user(NewUser {
            email: body.email,
            password_hash,
            name: body.name,
            role: UserRole::Customer,
        })
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_customers(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    match state.store.list_customers().await {
        Ok(customers) => (StatusCode::OK, Json(customers)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_customer(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid customer id")
        }
    };

    match state.store.get_customer(id).await {
        Ok(found) => (StatusCode::OK, Json(found)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_customer(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateCustomerRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid customer id")
        }
    };

    let password_hash = match body.password {
        Some(password) => match hash_password(&password) {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!(error = %e, "failed to hash password");
                return errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "hash_error",
                    "failed to hash password",
                );
            }
        },
        None => None,
    };

    let update = UserUpdate {
        email: body.email,
        password_hash,
    };

    match state.store.update_customer(id, update).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_customer(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_role(&user, &[UserRole::Manager]) {
        return resp;
    }

    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid customer id")
        }
    };

    match state.store.delete_customer(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
