// src/auth/extractor.rs
// Axum extractor that resolves the Authorization header to an acting user

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::jwt::verify_token;
use crate::state::AppState;

/// The authenticated user behind the current request.
///
/// Every protected handler takes this explicitly; there is no ambient
/// identity anywhere below the HTTP layer.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

pub struct AuthRejection(&'static str);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": self.0 })),
        )
            .into_response()
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthRejection("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthRejection("Expected Bearer token"))?;

        let claims = verify_token(token).map_err(|_| AuthRejection("Invalid or expired token"))?;

        // The token may outlive the account; re-check it is still active
        let user = state
            .auth_service
            .verify_user_id(&claims.sub)
            .await
            .map_err(|_| AuthRejection("Account not found or disabled"))?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
        })
    }
}
