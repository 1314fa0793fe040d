use axum::extract::{Path, State};
use axum::response::Response;

use crate::auth::{AdminAccess, ApprovalGrant};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn list_organizers(
    _admin: AdminAccess,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let organizers = state.directory.list().await?;
    Ok(success(organizers, "Organizers retrieved"))
}

pub async fn get_organizer(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(organizer_id): Path<i64>,
) -> Result<Response, AppError> {
    let organizer = state.directory.get(organizer_id).await?;
    Ok(success(organizer, "Organizer retrieved"))
}

/// GET or POST /api/organizers/:id/approve
///
/// GET is what the admin email link issues; its `token` query parameter is
/// the credential. Scripted callers may POST with the admin key instead.
pub async fn approve_organizer(
    grant: ApprovalGrant,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let organizer = state.directory.approve(grant.organizer_id).await?;
    Ok(success(organizer, "Organizer approved"))
}
