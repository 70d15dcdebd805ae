use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Persistence or connectivity failure. "Not found" is never a `StoreError`;
/// lookups return `Option` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violation: {0}")]
    Conflict(String),
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification store error: {0}")]
    Store(#[from] StoreError),

    #[error("notification backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the invite workflows.
#[derive(Debug, Error)]
pub enum InviteError {
    /// Only raised when accepting a token that matches no pending invite.
    #[error("invite not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// Opaque failure from email delivery, user/project lookup or the
    /// membership grant. Passed through without interpretation.
    #[error("collaborator error: {0}")]
    Collaborator(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error(transparent)]
    Invite(InviteError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<InviteError> for AppError {
    fn from(e: InviteError) -> Self {
        match e {
            InviteError::NotFound => AppError::NotFound,
            other => AppError::Invite(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Invite(InviteError::Store(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "invite_not_found",
                "invite not found or no longer valid".to_string(),
            ),
            AppError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "bad_request",
                reason.clone(),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "unknown_user",
                "missing or unknown x-user-id".to_string(),
            ),
            AppError::Invite(e) => {
                tracing::error!("Invite workflow error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let resp = AppError::from(InviteError::NotFound).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_other_invite_errors_map_to_500() {
        let store = AppError::from(InviteError::Store(StoreError::Unavailable("down".into())));
        assert_eq!(store.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let collab = AppError::from(InviteError::Collaborator(anyhow::anyhow!("smtp refused")));
        assert_eq!(collab.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let notif = AppError::from(InviteError::Notification(NotificationError::Backend(
            "boom".into(),
        )));
        assert_eq!(notif.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_request_and_unauthenticated() {
        assert_eq!(
            AppError::BadRequest("no".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
