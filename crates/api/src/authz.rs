//! API-side role guard.
//!
//! Roles are enforced at the handler boundary, before any store call, so the
//! store layer stays auth-agnostic.

use axum::http::StatusCode;
use axum::response::Response;

use fixtrack_auth::{require_any_role, UserRole};

use crate::app::errors::json_error;
use crate::context::CurrentUser;

/// Check that the caller holds one of the allowed roles.
///
/// Returns a ready-to-send 403 response on failure so handlers can
/// early-return with `?`-free match syntax.
pub fn require_role(user: &CurrentUser, allowed: &[UserRole]) -> Result<(), Response> {
    require_any_role(user.role, allowed)
        .map_err(|e| json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}
