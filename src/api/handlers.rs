use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::AppState;
use crate::errors::AppError;
use crate::models::invite::{Invite, PrivilegeLevel};
use crate::models::user::User;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct CreateInviteRequest {
    pub email: String,
    pub privileges: PrivilegeLevel,
}

/// Invite as shown to project members. The token is only ever delivered
/// to the invitee, never listed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub email: String,
    pub sending_user_id: Uuid,
    pub privileges: PrivilegeLevel,
    pub created_at: DateTime<Utc>,
}

impl From<Invite> for InviteResponse {
    fn from(i: Invite) -> Self {
        Self {
            id: i.id,
            project_id: i.project_id,
            email: i.email,
            sending_user_id: i.sending_user_id,
            privileges: i.privileges,
            created_at: i.created_at,
        }
    }
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::BadRequest(format!("invalid email address '{}'", raw.trim()))),
    }
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /api/v1/projects/:project_id/invites — list pending invites
pub async fn list_invites(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<InviteResponse>>, AppError> {
    let invites = state.invites.get_all_invites(project_id).await?;
    Ok(Json(invites.into_iter().map(InviteResponse::from).collect()))
}

/// GET /api/v1/projects/:project_id/invites/count — count pending invites
pub async fn count_invites(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = state.invites.get_invite_count(project_id).await?;
    Ok(Json(json!({ "count": count })))
}

/// POST /api/v1/projects/:project_id/invites — invite a collaborator
pub async fn create_invite(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateInviteRequest>,
) -> Result<(StatusCode, Json<InviteResponse>), AppError> {
    let email = normalize_email(&payload.email)?;
    let invite = state
        .invites
        .send_invite(project_id, &user, &email, payload.privileges)
        .await?;
    Ok((StatusCode::CREATED, Json(invite.into())))
}

/// POST /api/v1/projects/:project_id/invites/:invite_id/resend
pub async fn resend_invite(
    State(state): State<Arc<AppState>>,
    Path((project_id, invite_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    state
        .invites
        .resend_invite(project_id, &user, invite_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/projects/:project_id/invites/:invite_id — revoke
pub async fn revoke_invite(
    State(state): State<Arc<AppState>>,
    Path((project_id, invite_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.invites.revoke_invite(project_id, invite_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/projects/:project_id/invites/token/:token — look up by token
pub async fn get_invite_by_token(
    State(state): State<Arc<AppState>>,
    Path((project_id, token)): Path<(Uuid, String)>,
) -> Result<Json<InviteResponse>, AppError> {
    let invite = state
        .invites
        .get_invite_by_token(project_id, &token)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(invite.into()))
}

/// POST /api/v1/projects/:project_id/invites/token/:token/accept
pub async fn accept_invite(
    State(state): State<Arc<AppState>>,
    Path((project_id, token)): Path<(Uuid, String)>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    state
        .invites
        .accept_invite(project_id, &token, &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  User@Example.COM ").unwrap(),
            "user@example.com"
        );
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("user@").is_err());
    }
}
