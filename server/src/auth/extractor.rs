use axum::async_trait;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::state::AppState;
use crate::utils::error::AppError;

/// Organizer identity proven by a bearer token from `/api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedOrganizer {
    pub id: i64,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedOrganizer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = state.tokens.verify(bearer_token(parts)?)?;
        Ok(Self {
            id: claims.organizer_id()?,
            email: claims.email,
        })
    }
}

/// Caller holding the configured `ADMIN_API_KEY`.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

#[async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let expected = state
            .admin_api_key
            .as_deref()
            .ok_or_else(|| AppError::Forbidden("Admin API is disabled".to_string()))?;

        let presented = bearer_token(parts)?;
        if !bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AppError::AuthError("Invalid admin key".to_string()));
        }
        Ok(Self)
    }
}

#[derive(Debug, Deserialize)]
struct ApprovalQuery {
    token: Option<String>,
}

/// Permission to approve the organizer in the path: the signed `token` from
/// the admin email link, or the admin key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalGrant {
    pub organizer_id: i64,
}

#[async_trait]
impl FromRequestParts<AppState> for ApprovalGrant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(organizer_id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::ValidationError(e.body_text()))?;
        let Query(query) = Query::<ApprovalQuery>::try_from_uri(&parts.uri)?;

        match query.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => state.tokens.verify_approval(token, organizer_id)?,
            None => {
                AdminAccess::from_request_parts(parts, state).await?;
            }
        }
        Ok(Self { organizer_id })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))
}
