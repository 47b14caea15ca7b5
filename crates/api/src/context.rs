use fixtrack_auth::UserRole;
use fixtrack_core::UserId;

/// Authenticated identity for a request, derived from the bearer token.
///
/// Present as a request extension on all protected routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub role: UserRole,
}
