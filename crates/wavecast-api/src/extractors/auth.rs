//! `AuthUser` extractor — pulls the JWT from the Authorization header,
//! validates it, and exposes the caller identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use wavecast_auth::jwt::Claims;
use wavecast_console::dto::Caller;
use wavecast_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Extracted authenticated user context available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// The caller identity the coordinator operates on.
    pub fn caller(&self) -> Caller {
        Caller::new(self.0.user_id(), self.0.name.clone())
    }

    /// Whether the token carries the admin role.
    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }
}

impl std::ops::Deref for AuthUser {
    type Target = Claims;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

        let claims = state.jwt_decoder.decode(token)?;

        Ok(AuthUser(claims))
    }
}
