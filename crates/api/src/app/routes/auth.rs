use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::{Duration, Utc};

use fixtrack_auth::{verify_password, JwtClaims};

use crate::app::{dto, errors};
use crate::app::state::AppState;

/// Token lifetime matches a working day with slack.
const TOKEN_TTL_HOURS: i64 = 24;

pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let creds = match state.store.find_credentials(&body.email).await {
        Ok(c) => c,
        Err(e) => return errors::store_error_to_response(e),
    };

    // Same response for unknown email and wrong password.
    let Some(creds) = creds else {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid email or password",
        );
    };
    if !verify_password(&body.password, &creds.password_hash) {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid email or password",
        );
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: creds.user.id,
        email: creds.user.email.clone(),
        role: creds.user.role,
        iat: now,
        exp: now + Duration::hours(TOKEN_TTL_HOURS),
    };

    let token = match state.jwt.issue(&claims) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "failed to issue token");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                "failed to issue token",
            );
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "accessToken": token,
            "user": creds.user,
        })),
    )
        .into_response()
}
