use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::directory::{ProjectDirectory, UserDirectory};
use crate::errors::AppError;
use crate::invites::{InviteDeps, InviteHandler, RandomTokenGenerator};
use crate::membership::MembershipService;
use crate::notification::email::MailRelayMailer;
use crate::notification::{NotificationStore, NotificationsBuilder};
use crate::store::InviteStore;

pub mod handlers;

/// Shared state for the invite API.
pub struct AppState {
    pub invites: InviteHandler,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Wire every collaborator to one storage backend, with invite emails
    /// going through the configured mail relay.
    pub fn from_backend<B>(backend: Arc<B>, cfg: &Config) -> Self
    where
        B: InviteStore
            + NotificationStore
            + UserDirectory
            + ProjectDirectory
            + MembershipService
            + 'static,
    {
        let mailer = MailRelayMailer::new(
            cfg.mail_relay_url.clone(),
            cfg.mail_relay_secret.clone(),
            cfg.site_url.clone(),
            backend.clone(),
        );

        let invites = InviteHandler::new(InviteDeps {
            store: backend.clone(),
            tokens: Arc::new(RandomTokenGenerator),
            notifications: NotificationsBuilder::new(backend.clone()),
            mailer: Arc::new(mailer),
            users: backend.clone(),
            projects: backend.clone(),
            membership: backend.clone(),
        });

        Self {
            invites,
            users: backend,
        }
    }
}

/// Build the invite API router.
/// All routes are relative; the caller mounts this under `/api/v1`.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/projects/:project_id/invites",
            get(handlers::list_invites).post(handlers::create_invite),
        )
        .route(
            "/projects/:project_id/invites/count",
            get(handlers::count_invites),
        )
        .route(
            "/projects/:project_id/invites/:invite_id",
            delete(handlers::revoke_invite),
        )
        .route(
            "/projects/:project_id/invites/:invite_id/resend",
            post(handlers::resend_invite),
        )
        .route(
            "/projects/:project_id/invites/token/:token",
            get(handlers::get_invite_by_token),
        )
        .route(
            "/projects/:project_id/invites/token/:token/accept",
            post(handlers::accept_invite),
        )
        .layer(middleware::from_fn_with_state(state.clone(), identify_user))
        .layer(TraceLayer::new_for_http())
        .fallback(fallback_404)
        .with_state(state)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Middleware: resolves the caller from the `x-user-id` header set by the
/// authenticating proxy in front of this service, and stores the `User` in
/// request extensions. Returns 401 if the header is missing or unknown.
async fn identify_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = req
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok());

    let user_id = match user_id {
        Some(id) => id,
        None => {
            tracing::warn!("invite API: missing or malformed x-user-id header");
            return Err(AppError::Unauthenticated);
        }
    };

    let user = match state.users.get_user(user_id).await? {
        Some(user) => user,
        None => {
            tracing::warn!(%user_id, "invite API: unknown user");
            return Err(AppError::Unauthenticated);
        }
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
