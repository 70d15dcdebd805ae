//! In-app notifications tied to pending invites.
//!
//! Each invite owns at most one notification slot, keyed
//! `project-invite-<invite id>`. Creating it needs the target account;
//! dismissing it needs only the invite id.

pub mod email;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{NotificationError, StoreError};
use crate::models::invite::Invite;
use crate::models::notification::NewNotification;

pub const PROJECT_INVITE_TEMPLATE: &str = "notification_project_invite";

/// Storage backend for notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert the notification, replacing any existing one with the same
    /// `(user_id, key)` and marking it unread again.
    async fn upsert_notification(&self, notification: &NewNotification) -> Result<(), StoreError>;

    /// Mark every notification with `key` as read, whoever it belongs to.
    /// Returns whether anything changed.
    async fn mark_read_by_key(&self, key: &str) -> Result<bool, StoreError>;
}

pub fn project_invite_key(invite_id: Uuid) -> String {
    format!("project-invite-{}", invite_id)
}

/// What the invitee sees: who invited them and to what.
#[derive(Debug, Clone, Serialize)]
pub struct InviteNotificationPayload {
    pub user_name: String,
    pub project_name: String,
}

/// Resolves notification handles. Pure addressing; no I/O happens here.
#[derive(Clone)]
pub struct NotificationsBuilder {
    store: Arc<dyn NotificationStore>,
}

impl NotificationsBuilder {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Handle for the invite notification shown to `target_user_id`.
    pub fn project_invite(
        &self,
        target_user_id: Uuid,
        project_id: Uuid,
        invite: &Invite,
    ) -> ProjectInviteNotification {
        ProjectInviteNotification {
            store: self.store.clone(),
            key: project_invite_key(invite.id),
            target: Some(InviteTarget {
                user_id: target_user_id,
                project_id,
                token: invite.token.clone(),
            }),
        }
    }

    /// Handle addressed by invite id alone. Can only be read, not created.
    pub fn project_invite_by_id(&self, invite_id: Uuid) -> ProjectInviteNotification {
        ProjectInviteNotification {
            store: self.store.clone(),
            key: project_invite_key(invite_id),
            target: None,
        }
    }
}

struct InviteTarget {
    user_id: Uuid,
    project_id: Uuid,
    token: String,
}

pub struct ProjectInviteNotification {
    store: Arc<dyn NotificationStore>,
    key: String,
    target: Option<InviteTarget>,
}

impl ProjectInviteNotification {
    pub async fn create(&self, payload: &InviteNotificationPayload) -> Result<(), NotificationError> {
        let target = self.target.as_ref().ok_or_else(|| {
            NotificationError::Backend(format!("notification {} has no target user", self.key))
        })?;

        let notification = NewNotification {
            user_id: target.user_id,
            key: self.key.clone(),
            template_key: PROJECT_INVITE_TEMPLATE.to_string(),
            message_opts: serde_json::json!({
                "userName": payload.user_name,
                "projectName": payload.project_name,
                "projectId": target.project_id,
                "token": target.token,
            }),
        };

        self.store.upsert_notification(&notification).await?;
        tracing::debug!(key = %self.key, user_id = %target.user_id, "invite notification created");
        Ok(())
    }

    /// Dismiss the notification. Not an error when none exists.
    pub async fn read(&self) -> Result<(), NotificationError> {
        let changed = self.store.mark_read_by_key(&self.key).await?;
        tracing::debug!(key = %self.key, changed, "invite notification marked read");
        Ok(())
    }
}
